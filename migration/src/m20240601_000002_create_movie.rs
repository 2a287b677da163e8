use sea_orm_migration::{prelude::*, schema::*};

use crate::m20240601_000001_create_connection::Connection;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(integer(Movie::ConnectionId))
                    .col(integer(Movie::ArrId))
                    .col(string(Movie::Title))
                    .col(integer_null(Movie::Year))
                    .col(string_null(Movie::ImdbId))
                    .col(string_null(Movie::TmdbId))
                    .col(text_null(Movie::Overview))
                    .col(integer_null(Movie::Runtime))
                    .col(string_null(Movie::YoutubeTrailerId))
                    .col(string_null(Movie::FolderPath))
                    .col(string_null(Movie::PosterUrl))
                    .col(string_null(Movie::FanartUrl))
                    .col(boolean(Movie::TrailerExists).default(false))
                    .col(boolean(Movie::Monitor).default(false))
                    .col(boolean(Movie::ArrMonitored).default(false))
                    .col(big_integer(Movie::AddedAt))
                    .col(big_integer(Movie::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_connection")
                            .from(Movie::Table, Movie::ConnectionId)
                            .to(Connection::Table, Connection::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_connection_arr_unique")
                    .table(Movie::Table)
                    .col(Movie::ConnectionId)
                    .col(Movie::ArrId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_title")
                    .table(Movie::Table)
                    .col(Movie::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_added_at")
                    .table(Movie::Table)
                    .col(Movie::AddedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    ConnectionId,
    ArrId,
    Title,
    Year,
    ImdbId,
    TmdbId,
    Overview,
    Runtime,
    YoutubeTrailerId,
    FolderPath,
    PosterUrl,
    FanartUrl,
    TrailerExists,
    Monitor,
    ArrMonitored,
    AddedAt,
    UpdatedAt,
}
