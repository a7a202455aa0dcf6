//! Repository commands: list, add, refresh, seen

use anyhow::{bail, Context, Result};
use clap::Parser;
use relwatch_core::{ReleaseId, RepositoryId, RepositoryView, SeenStatus, TrackerConfig, UserId};

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only repositories with an unseen latest release
    #[arg(long)]
    pub unseen: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Repository URL, e.g. https://github.com/tokio-rs/tokio
    pub url: String,

    /// Print JSON instead of a summary line
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Repository id to refresh
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<RepositoryId>,

    /// Refresh every tracked repository
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct SeenArgs {
    /// Repository id
    pub repository_id: RepositoryId,

    /// Release id to mark as seen
    pub release_id: ReleaseId,
}

pub async fn run_list(args: ListArgs, config: &TrackerConfig, user: Option<&str>) -> Result<()> {
    let tracker = super::tracker(config).await?;
    let ctx = tracker.context(UserId::from_raw(user));

    let mut views = tracker.list_repositories(&ctx).await?;
    if args.unseen {
        views.retain(|view| view.seen.is_unseen);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else if views.is_empty() {
        println!("No repositories tracked");
    } else {
        for view in &views {
            println!("{}", format_row(view));
        }
    }
    Ok(())
}

pub async fn run_add(args: AddArgs, config: &TrackerConfig, user: Option<&str>) -> Result<()> {
    let tracker = super::tracker(config).await?;
    let ctx = tracker.context(UserId::from_raw(user));

    let view = tracker
        .add_repository(&ctx, &args.url)
        .await
        .with_context(|| format!("Failed to add {}", args.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("Tracking {}", format_row(&view));
    }
    Ok(())
}

pub async fn run_refresh(args: RefreshArgs, config: &TrackerConfig, user: Option<&str>) -> Result<()> {
    let tracker = super::tracker(config).await?;

    if args.all {
        let summary = tracker.refresh_all().await?;
        println!(
            "Refreshed {} repositories ({} without releases, {} failed)",
            summary.total(),
            summary.without_release,
            summary.failed
        );
        if summary.failed > 0 {
            bail!("{} repositories failed to refresh", summary.failed);
        }
        return Ok(());
    }

    let id = args.id.context("repository id required without --all")?;
    let ctx = tracker.context(UserId::from_raw(user));
    let view = tracker
        .refresh_repository(&ctx, id)
        .await
        .with_context(|| format!("Failed to refresh repository {id}"))?;
    println!("{}", format_row(&view));
    Ok(())
}

pub async fn run_seen(args: SeenArgs, config: &TrackerConfig, user: Option<&str>) -> Result<()> {
    let tracker = super::tracker(config).await?;
    let ctx = tracker.context(UserId::from_raw(user));

    let status = tracker
        .mark_release_seen(&ctx, args.repository_id, args.release_id)
        .await?;
    println!("{}", format_status(&status));
    Ok(())
}

fn format_row(view: &RepositoryView) -> String {
    let release = view
        .latest_release
        .as_ref()
        .map(|r| format!("{} (#{})", r.tag_name, r.id))
        .unwrap_or_else(|| "-".to_string());
    let marker = if view.seen.is_unseen { "  NEW" } else { "" };
    format!(
        "{:>5}  {:<40}  {}{}",
        view.id.get(),
        format!("{}/{}", view.owner, view.name),
        release,
        marker
    )
}

fn format_status(status: &SeenStatus) -> String {
    match (status.release_id, status.is_unseen) {
        (_, true) => "A newer release is available".to_string(),
        (Some(id), false) => format!("Up to date (last seen release #{id})"),
        (None, false) => "No releases yet".to_string(),
    }
}
