//! Command implementations for the relwatch CLI

pub mod config;
pub mod migrate;
pub mod repos;
pub mod serve;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use relwatch_core::{Tracker, TrackerConfig};
use relwatch_server::{connect_store, GitHubClient, GitHubConfig, PgStore};

/// Database URL from config/env, with a hint when missing.
pub(crate) fn database_url(config: &TrackerConfig) -> Result<&str> {
    config.database.url.as_deref().context(
        "DATABASE_URL not set. Set via DATABASE_URL env, .env, or [database] url in ~/.relwatch/config.toml",
    )
}

pub(crate) async fn connect(config: &TrackerConfig) -> Result<PgStore> {
    let url = database_url(config)?;
    connect_store(url, config.database.max_connections)
        .await
        .context("Failed to connect to database")
}

pub(crate) fn github(config: &TrackerConfig) -> Result<GitHubClient> {
    GitHubClient::new(&GitHubConfig::from(&config.github)).context("Failed to build GitHub client")
}

/// Tracker over Postgres and the GitHub API.
pub(crate) async fn tracker(config: &TrackerConfig) -> Result<Tracker> {
    let store = connect(config).await?;
    Ok(Tracker::new(Arc::new(store), Arc::new(github(config)?))
        .with_yield_count(config.loader.yield_count))
}

/// `None` for a missing or zero interval.
pub(crate) fn poll_interval(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}
