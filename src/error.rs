use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn movie_not_found(id: i32) -> Self {
        Self::NotFound(format!("Movie not found. Movie id: {id} does not exist!"))
    }

    pub fn connection_not_found(id: i32) -> Self {
        Self::NotFound(format!("Connection not found. Connection id: {id} does not exist!"))
    }

    pub fn movie_exists(connection_id: i32, arr_id: i32) -> Self {
        Self::Conflict(format!(
            "Movie with arr id: {arr_id} already exists in connection id: {connection_id}!"
        ))
    }

    /// Translates constraint violations raised by the database while writing a
    /// movie row into the matching domain error.
    pub(crate) fn from_movie_write(err: DbErr, connection_id: i32, arr_id: i32) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::movie_exists(connection_id, arr_id),
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                Self::connection_not_found(connection_id)
            },
            _ => Self::Db(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
