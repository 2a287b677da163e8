use std::time::Duration;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub plex_server_url: String,
    pub plex_auth_token: Option<String>,
    pub plex_timeout: Duration,
    pub plex_accept_invalid_certs: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://trailarr.db?mode=rwc".to_string());

        let plex_server_url = std::env::var("PLEX_SERVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:32400".to_string());

        let plex_auth_token =
            std::env::var("PLEX_AUTH_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let plex_timeout_secs: u64 = std::env::var("PLEX_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("PLEX_TIMEOUT_SECS")?;

        let plex_accept_invalid_certs = std::env::var("PLEX_ACCEPT_INVALID_CERTS")
            .ok()
            .map(|s| parse_bool(&s))
            .transpose()
            .context("PLEX_ACCEPT_INVALID_CERTS")?
            .unwrap_or(false);

        Ok(Self {
            database_url,
            plex_server_url,
            plex_auth_token,
            plex_timeout: Duration::from_secs(plex_timeout_secs),
            plex_accept_invalid_certs,
        })
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parses_common_boolean_spellings() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool(" on ").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
