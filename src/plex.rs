use reqwest::{
    Method, StatusCode,
    header::{ACCEPT, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error, info, warn};

use crate::config::Config;

const TOKEN_PARAM: &str = "X-Plex-Token";

#[derive(Debug, thiserror::Error)]
pub enum PlexError {
    #[error("access denied, check the Plex authentication token")]
    Unauthorized,
    #[error("error communicating with Plex API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("empty response received from Plex API")]
    EmptyResponse,
    #[error("error decoding Plex API response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type PlexResult<T> = Result<T, PlexError>;

/// A library entry as listed by `/library/sections/{key}/all`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlexItem {
    pub rating_key: String,
    pub title: String,
    pub file: Option<String>,
}

pub struct PlexClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, token: token.into() }
    }

    /// Builds an HTTP client from `config`. Fails when no token is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(token) = config.plex_auth_token.clone() else {
            anyhow::bail!("PLEX_AUTH_TOKEN is not set");
        };
        let http = reqwest::Client::builder()
            .user_agent("trailarr/0.1")
            .timeout(config.plex_timeout)
            .danger_accept_invalid_certs(config.plex_accept_invalid_certs)
            .build()?;
        Ok(Self::new(http, config.plex_server_url.clone(), token))
    }

    pub async fn library_sections(&self) -> PlexResult<Vec<String>> {
        let resp: Envelope<SectionsContainer> =
            self.get_json(&format!("{}/library/sections", self.base_url)).await?;
        let keys: Vec<String> = resp.container.directories.into_iter().map(|d| d.key).collect();
        debug!(sections = ?keys, "fetched library sections");
        Ok(keys)
    }

    pub async fn section_items(&self, section_key: &str) -> PlexResult<Vec<PlexItem>> {
        let url = format!("{}/library/sections/{}/all", self.base_url, section_key);
        let resp: Envelope<ItemsContainer> = self.get_json(&url).await?;
        Ok(resp.container.metadata.into_iter().map(PlexItem::from).collect())
    }

    /// Pairs each item's file path with its rating key, in library listing
    /// order. Items without media parts are keyed by title; a repeated key keeps
    /// its first position and takes the later rating key. Sections whose body
    /// does not decode are skipped, every other failure is returned.
    pub async fn media_index(&self) -> PlexResult<Vec<(String, String)>> {
        let mut index: Vec<(String, String)> = Vec::new();
        for section in self.library_sections().await? {
            let items = match self.section_items(&section).await {
                Ok(items) => items,
                Err(PlexError::Decode(err)) => {
                    error!(section = %section, error = %err, "error processing section");
                    continue;
                },
                Err(err) => return Err(err),
            };
            for item in items {
                let key = match item.file {
                    Some(file) => file,
                    None => {
                        warn!(
                            rating_key = %item.rating_key,
                            title = %item.title,
                            "item has no media part, indexing by title"
                        );
                        item.title
                    },
                };
                match index.iter_mut().find(|(path, _)| *path == key) {
                    Some(entry) => entry.1 = item.rating_key,
                    None => index.push((key, item.rating_key)),
                }
            }
        }
        debug!(items = index.len(), "built media index");
        Ok(index)
    }

    pub async fn refresh_item(&self, rating_key: &str) -> PlexResult<()> {
        let url = format!("{}/library/metadata/{}/refresh", self.base_url, rating_key);
        self.send(Method::PUT, &url).await?;
        Ok(())
    }

    /// Refreshes the first library item whose path contains `directory`.
    /// Returns the refreshed rating key, or `None` when nothing matches.
    pub async fn refresh_directory(&self, directory: &str) -> PlexResult<Option<String>> {
        info!(directory = %directory, "refreshing metadata");
        let index = self.media_index().await?;

        let Some((path, rating_key)) = index.iter().find(|(path, _)| path.contains(directory))
        else {
            error!(directory = %directory, "directory not found in Plex library");
            return Ok(None);
        };

        debug!(path = %path, rating_key = %rating_key, "matched library item");
        self.refresh_item(rating_key).await?;
        info!(directory = %directory, rating_key = %rating_key, "metadata refreshed");
        Ok(Some(rating_key.clone()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> PlexResult<T> {
        let resp = self.send(Method::GET, url).await?;
        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(PlexError::EmptyResponse);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, method: Method, url: &str) -> PlexResult<reqwest::Response> {
        let resp = self
            .client
            .request(method, url)
            .query(&[(TOKEN_PARAM, &self.token)])
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(TOKEN_PARAM, &self.token)
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(PlexError::Unauthorized);
        }
        Ok(resp.error_for_status()?)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Debug, Deserialize)]
struct SectionsContainer {
    #[serde(rename = "Directory")]
    directories: Vec<Directory>,
}

#[derive(Debug, Deserialize)]
struct Directory {
    key: String,
}

#[derive(Debug, Deserialize)]
struct ItemsContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "Media", default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(rename = "Part", default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    file: Option<String>,
}

impl From<Metadata> for PlexItem {
    fn from(meta: Metadata) -> Self {
        let file = meta
            .media
            .into_iter()
            .next()
            .and_then(|m| m.parts.into_iter().next())
            .and_then(|p| p.file);
        Self { rating_key: meta.rating_key, title: meta.title, file }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_uses_first_media_part() {
        let meta: Metadata = serde_json::from_str(
            r#"{"ratingKey":"42","title":"Fantasmas","Media":[{"Part":[
                {"file":"/movies/Fantasmas (2024)/f.mkv"},{"file":"/other.mkv"}]}]}"#,
        )
        .unwrap();
        let item = PlexItem::from(meta);
        assert_eq!(item.rating_key, "42");
        assert_eq!(item.file.as_deref(), Some("/movies/Fantasmas (2024)/f.mkv"));
    }

    #[test]
    fn item_without_media_has_no_file() {
        let meta: Metadata = serde_json::from_str(r#"{"ratingKey":"7","title":"Loose"}"#).unwrap();
        assert_eq!(PlexItem::from(meta).file, None);
    }

    #[test]
    fn section_without_metadata_is_empty() {
        let env: Envelope<ItemsContainer> =
            serde_json::from_str(r#"{"MediaContainer":{"size":0}}"#).unwrap();
        assert!(env.container.metadata.is_empty());
    }

    #[test]
    fn sections_require_directory_list() {
        let res: Result<Envelope<SectionsContainer>, _> =
            serde_json::from_str(r#"{"MediaContainer":{"size":0}}"#);
        assert!(res.is_err());
    }
}
