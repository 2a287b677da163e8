pub mod config;
pub mod connections;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod movies;
pub mod plex;

pub use crate::{
    config::Config,
    connections::ConnectionRepository,
    error::{AppError, AppResult},
    movies::MovieRepository,
    plex::{PlexClient, PlexError},
};

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
