use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relwatch_core::TrackerConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show config file path
    Path,
    /// Show the resolved configuration (secrets masked)
    Show,
}

pub fn run_config(args: ConfigArgs, config: &TrackerConfig, path: Option<&PathBuf>) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            let path = path.cloned().unwrap_or_else(TrackerConfig::config_path);
            let note = if path.exists() { "" } else { " (not created)" };
            println!("{}{}", path.display(), note);
        }
        ConfigCommands::Show => {
            let rendered = config
                .to_redacted_toml()
                .context("Failed to render configuration")?;
            print!("{rendered}");
        }
    }
    Ok(())
}
