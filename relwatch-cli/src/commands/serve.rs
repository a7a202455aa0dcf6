//! HTTP server command
//!
//! Runs the relwatch API, optionally polling GitHub in the background.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relwatch_core::store::MemoryStore;
use relwatch_core::{Tracker, TrackerConfig};
use relwatch_server::{run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: server.bind from config, 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Refresh every repository every N seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Keep everything in memory instead of Postgres (lost on exit)
    #[arg(long)]
    pub memory: bool,
}

fn server_config(args: &ServeArgs, config: &TrackerConfig) -> Result<ServerConfig> {
    let bind_addr = match args.bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid server.bind address '{}'", config.server.bind))?,
    };

    Ok(ServerConfig {
        bind_addr,
        cors_permissive: args.cors_permissive || config.server.cors_permissive,
        poll_interval: super::poll_interval(args.poll_interval.or(config.server.poll_interval_secs)),
    })
}

pub async fn run_serve(args: ServeArgs, config: &TrackerConfig) -> Result<()> {
    let server_config = server_config(&args, config)?;

    let tracker = if args.memory {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Tracker::new(Arc::new(MemoryStore::new()), Arc::new(super::github(config)?))
            .with_yield_count(config.loader.yield_count)
    } else {
        super::tracker(config).await?
    };

    tracing::info!(
        bind = %server_config.bind_addr,
        poll_secs = server_config.poll_interval.map(|d| d.as_secs()),
        "Starting relwatch server"
    );

    run_server(Arc::new(tracker), server_config)
        .await
        .context("Server error")?;

    Ok(())
}
