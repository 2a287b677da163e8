use serde::{Deserialize, Serialize};

use crate::{
    entities::{connection, movie},
    error::{AppError, AppResult},
};

pub const MIN_YEAR: i32 = 1800;
pub const MAX_YEAR: i32 = 2200;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrType {
    Radarr,
    Sonarr,
}

impl ArrType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrType::Radarr => "radarr",
            ArrType::Sonarr => "sonarr",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "radarr" => Some(ArrType::Radarr),
            "sonarr" => Some(ArrType::Sonarr),
            _ => None,
        }
    }
}

/// How trailers are monitored for media coming from a connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Missing,
    New,
    None,
    Sync,
}

impl MonitorType {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorType::Missing => "missing",
            MonitorType::New => "new",
            MonitorType::None => "none",
            MonitorType::Sync => "sync",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "missing" => Some(MonitorType::Missing),
            "new" => Some(MonitorType::New),
            "none" => Some(MonitorType::None),
            "sync" => Some(MonitorType::Sync),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionCreate {
    pub name: String,
    pub arr_type: ArrType,
    pub url: String,
    pub api_key: String,
    pub monitor: MonitorType,
}

impl ConnectionCreate {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("connection name is required"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AppError::validation("connection url must start with http(s)://"));
        }
        if self.api_key.trim().is_empty() {
            return Err(AppError::validation("connection api key is required"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Connection {
    pub id: i32,
    pub name: String,
    pub arr_type: ArrType,
    pub url: String,
    pub api_key: String,
    pub monitor: MonitorType,
    pub added_at: i64,
}

impl TryFrom<connection::Model> for Connection {
    type Error = AppError;

    fn try_from(row: connection::Model) -> AppResult<Self> {
        let arr_type = ArrType::from_name(&row.arr_type).ok_or_else(|| {
            AppError::validation(format!("unknown arr type stored: {}", row.arr_type))
        })?;
        let monitor = MonitorType::from_name(&row.monitor).ok_or_else(|| {
            AppError::validation(format!("unknown monitor type stored: {}", row.monitor))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            arr_type,
            url: row.url,
            api_key: row.api_key,
            monitor,
            added_at: row.added_at,
        })
    }
}

/// A movie as reported by an Arr connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MovieCreate {
    pub connection_id: i32,
    pub arr_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<i32>,
    pub youtube_trailer_id: Option<String>,
    pub folder_path: Option<String>,
    pub poster_url: Option<String>,
    pub fanart_url: Option<String>,
    #[serde(default)]
    pub arr_monitored: bool,
}

impl MovieCreate {
    pub fn new(connection_id: i32, arr_id: i32, title: impl Into<String>) -> Self {
        Self { connection_id, arr_id, title: title.into(), ..Default::default() }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.arr_id <= 0 {
            return Err(AppError::validation("arr_id must be a positive integer"));
        }
        validate_title(&self.title)?;
        validate_year(self.year)?;
        validate_runtime(self.runtime)?;
        validate_imdb_id(self.imdb_id.as_deref())?;
        validate_tmdb_id(self.tmdb_id.as_deref())?;
        Ok(())
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<i32>,
    pub youtube_trailer_id: Option<String>,
    pub folder_path: Option<String>,
    pub poster_url: Option<String>,
    pub fanart_url: Option<String>,
    pub trailer_exists: Option<bool>,
    pub monitor: Option<bool>,
    pub arr_monitored: Option<bool>,
}

impl MovieUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_year(self.year)?;
        validate_runtime(self.runtime)?;
        validate_imdb_id(self.imdb_id.as_deref())?;
        validate_tmdb_id(self.tmdb_id.as_deref())?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub connection_id: i32,
    pub arr_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<i32>,
    pub youtube_trailer_id: Option<String>,
    pub folder_path: Option<String>,
    pub poster_url: Option<String>,
    pub fanart_url: Option<String>,
    pub trailer_exists: bool,
    pub monitor: bool,
    pub arr_monitored: bool,
    pub added_at: i64,
    pub updated_at: i64,
}

impl From<movie::Model> for Movie {
    fn from(row: movie::Model) -> Self {
        Self {
            id: row.id,
            connection_id: row.connection_id,
            arr_id: row.arr_id,
            title: row.title,
            year: row.year,
            imdb_id: row.imdb_id,
            tmdb_id: row.tmdb_id,
            overview: row.overview,
            runtime: row.runtime,
            youtube_trailer_id: row.youtube_trailer_id,
            folder_path: row.folder_path,
            poster_url: row.poster_url,
            fanart_url: row.fanart_url,
            trailer_exists: row.trailer_exists,
            monitor: row.monitor,
            arr_monitored: row.arr_monitored,
            added_at: row.added_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub created: usize,
    pub updated: usize,
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title is required"));
    }
    Ok(())
}

fn validate_year(year: Option<i32>) -> AppResult<()> {
    match year {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => Err(AppError::validation(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}, got {y}"
        ))),
        _ => Ok(()),
    }
}

fn validate_runtime(runtime: Option<i32>) -> AppResult<()> {
    match runtime {
        Some(r) if r < 0 => Err(AppError::validation("runtime cannot be negative")),
        _ => Ok(()),
    }
}

pub(crate) fn is_imdb_id(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower
        .strip_prefix("tt")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

fn validate_imdb_id(imdb_id: Option<&str>) -> AppResult<()> {
    match imdb_id {
        Some(id) if !is_imdb_id(id) => {
            Err(AppError::validation(format!("imdb_id must look like tt1234567, got {id:?}")))
        },
        _ => Ok(()),
    }
}

fn validate_tmdb_id(tmdb_id: Option<&str>) -> AppResult<()> {
    match tmdb_id {
        Some(id) if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) => {
            Err(AppError::validation(format!("tmdb_id must be numeric, got {id:?}")))
        },
        _ => Ok(()),
    }
}
