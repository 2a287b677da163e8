use std::process::ExitCode;

use anyhow::Context;
use trailarr::{Config, PlexClient};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,trailarr=debug,update_plex=debug,sqlx=warn".to_string()),
        )
        .init();

    let directory = std::env::args()
        .nth(1)
        .filter(|d| !d.trim().is_empty())
        .context("usage: update-plex <directory>")?;

    let config = Config::from_env()?;
    let plex = PlexClient::from_config(&config)?;

    match plex.refresh_directory(&directory).await {
        Ok(Some(rating_key)) => {
            tracing::info!(directory = %directory, rating_key = %rating_key, "refresh requested");
            Ok(ExitCode::SUCCESS)
        },
        Ok(None) => Ok(ExitCode::FAILURE),
        Err(err) => {
            tracing::error!(directory = %directory, error = %err, "failed to refresh metadata");
            Ok(ExitCode::FAILURE)
        },
    }
}
