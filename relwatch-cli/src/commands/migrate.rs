//! Schema migration command

use anyhow::{Context, Result};
use relwatch_core::TrackerConfig;
use relwatch_server::db::{create_pool, migrations};

pub async fn run_migrate(config: &TrackerConfig) -> Result<()> {
    let url = super::database_url(config)?;
    let pool = create_pool(url)
        .await
        .context("Failed to create database pool")?;

    migrations::run(&pool).await.context("Migration failed")?;
    println!("Schema is up to date");
    Ok(())
}
