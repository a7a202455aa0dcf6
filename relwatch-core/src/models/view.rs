//! Caller-facing views

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Release, ReleaseId, Repository, RepositoryId, SeenStatus};

/// Release as shown to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseView {
    pub id: ReleaseId,
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<Release> for ReleaseView {
    fn from(r: Release) -> Self {
        Self {
            id: r.id,
            tag_name: r.tag_name,
            published_at: r.published_at,
            html_url: r.html_url,
            notes: r.notes,
        }
    }
}

/// Repository with its latest release and the caller's seen status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub id: RepositoryId,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub updated_at: DateTime<Utc>,
    pub latest_release: Option<ReleaseView>,
    pub seen: SeenStatus,
}

impl RepositoryView {
    pub fn new(repo: Repository, latest_release: Option<Release>, seen: SeenStatus) -> Self {
        Self {
            id: repo.id,
            owner: repo.owner,
            name: repo.name,
            description: repo.description,
            url: repo.url,
            updated_at: repo.updated_at,
            latest_release: latest_release.map(ReleaseView::from),
            seen,
        }
    }
}
