//! Release rows and the "latest release" ordering

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ReleaseId, RepositoryId};

/// Release record. `(repository_id, tag_name)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: ReleaseId,
    pub repository_id: RepositoryId,
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub html_url: Option<String>,
}

impl Release {
    /// Recency order used to pick the latest release.
    ///
    /// Greater `published_at` wins, a missing timestamp loses to any present
    /// one, and ties fall back to the greater (more recently inserted) id.
    pub fn cmp_recency(&self, other: &Self) -> Ordering {
        self.published_at
            .cmp(&other.published_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Latest release of a set, per [`Release::cmp_recency`].
    pub fn latest<'a>(releases: impl IntoIterator<Item = &'a Release>) -> Option<&'a Release> {
        releases.into_iter().max_by(|a, b| a.cmp_recency(b))
    }
}

/// Upsert input keyed on `(repository_id, tag_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub repository_id: RepositoryId,
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub html_url: Option<String>,
}
