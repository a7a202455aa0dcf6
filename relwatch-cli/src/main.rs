//! relwatch CLI - track GitHub releases and what you have already seen
//!
//! Entry point for the `relwatch` binary:
//! - `serve` runs the HTTP API (optionally with the background poller)
//! - `migrate` applies the Postgres schema
//! - `list`, `add`, `refresh`, `seen` operate on the tracker directly
//! - `config` shows where configuration lives and what it resolves to

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relwatch_core::TrackerConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "relwatch",
    author,
    version,
    about = "Track GitHub repositories and surface releases you have not seen yet",
    long_about = "Track GitHub repositories, store their latest release in Postgres, and report \
                  per user whether that release has been acknowledged."
)]
struct Cli {
    /// User id that seen status is recorded for (empty = anonymous)
    #[arg(long, short = 'u', global = true, env = "RELWATCH_USER")]
    user: Option<String>,

    /// Config file (default: ~/.relwatch/config.toml)
    #[arg(long, global = true, env = "RELWATCH_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply the database schema
    Migrate,
    /// List tracked repositories with their latest release
    List(commands::repos::ListArgs),
    /// Start tracking a GitHub repository
    Add(commands::repos::AddArgs),
    /// Fetch and store the latest release again
    Refresh(commands::repos::RefreshArgs),
    /// Mark a release as seen
    Seen(commands::repos::SeenArgs),
    /// Inspect configuration (path, show)
    Config(commands::config::ConfigArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<TrackerConfig> {
    match path {
        Some(path) => {
            let mut config = TrackerConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => TrackerConfig::load().context("Failed to load configuration"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })?;

    let config = load_config(cli.config.as_ref())?;
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run_serve(args, &config).await,
        Commands::Migrate => commands::migrate::run_migrate(&config).await,
        Commands::List(args) => commands::repos::run_list(args, &config, user).await,
        Commands::Add(args) => commands::repos::run_add(args, &config, user).await,
        Commands::Refresh(args) => commands::repos::run_refresh(args, &config, user).await,
        Commands::Seen(args) => commands::repos::run_seen(args, &config, user).await,
        Commands::Config(args) => commands::config::run_config(args, &config, cli.config.as_ref()),
    };

    tracing_setup::shutdown_otel();
    result
}
