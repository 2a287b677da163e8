use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;

use crate::{
    entities::connection,
    error::{AppError, AppResult},
    models::{Connection, ConnectionCreate},
};

/// Stores Arr connections. Talking to the Arr instance itself is out of scope here.
#[derive(Clone)]
pub struct ConnectionRepository {
    db: DatabaseConnection,
}

impl ConnectionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: ConnectionCreate) -> AppResult<Connection> {
        new.validate()?;

        let model = connection::ActiveModel {
            id: Default::default(),
            name: Set(new.name.trim().to_string()),
            arr_type: Set(new.arr_type.as_str().to_string()),
            url: Set(new.url.trim_end_matches('/').to_string()),
            api_key: Set(new.api_key),
            monitor: Set(new.monitor.as_str().to_string()),
            added_at: Set(crate::now_sec()),
        };
        let row = model.insert(&self.db).await?;
        debug!(connection_id = row.id, name = %row.name, "connection created");
        row.try_into()
    }

    pub async fn read(&self, id: i32) -> AppResult<Connection> {
        connection::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::connection_not_found(id))?
            .try_into()
    }

    pub async fn read_all(&self) -> AppResult<Vec<Connection>> {
        connection::Entity::find()
            .order_by_asc(connection::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Connection::try_from)
            .collect()
    }
}
