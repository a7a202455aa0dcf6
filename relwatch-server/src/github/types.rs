//! GitHub REST API response types.
//!
//! Only the fields relwatch reads; everything else in the payload is ignored.

use chrono::{DateTime, Utc};
use relwatch_core::provider::{ReleaseMetadata, RepoMetadata};
use serde::Deserialize;

/// `GET /repos/{owner}/{repo}` (subset of fields).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// `GET /repos/{owner}/{repo}/releases/latest` (subset of fields).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
}

/// Error body GitHub sends with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubErrorBody {
    pub message: String,
}

impl From<GitHubRepository> for RepoMetadata {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            url: repo.html_url,
            description: repo.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

impl From<GitHubRelease> for ReleaseMetadata {
    fn from(release: GitHubRelease) -> Self {
        Self {
            tag_name: release.tag_name,
            published_at: release.published_at,
            html_url: release.html_url,
            notes: release.body.filter(|b| !b.trim().is_empty()),
        }
    }
}
