use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connection::Table)
                    .if_not_exists()
                    .col(pk_auto(Connection::Id))
                    .col(string(Connection::Name))
                    .col(string(Connection::ArrType))
                    .col(string(Connection::Url))
                    .col(string(Connection::ApiKey))
                    .col(string(Connection::Monitor))
                    .col(big_integer(Connection::AddedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Connection::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Connection {
    Table,
    Id,
    Name,
    ArrType,
    Url,
    ApiKey,
    Monitor,
    AddedAt,
}
