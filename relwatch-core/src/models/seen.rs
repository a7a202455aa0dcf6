//! Seen events and the derived seen status

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ReleaseId, RepositoryId, UserId};

/// A user acknowledged a release. Keyed by `(user_id, repository_id, release_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenEvent {
    pub user_id: Option<UserId>,
    pub repository_id: RepositoryId,
    pub release_id: ReleaseId,
    pub seen_at: DateTime<Utc>,
}

impl SeenEvent {
    /// "Last seen" order: greater `seen_at`, then greater `release_id`.
    pub fn cmp_recency(&self, other: &Self) -> Ordering {
        self.seen_at
            .cmp(&other.seen_at)
            .then_with(|| self.release_id.cmp(&other.release_id))
    }
}

/// Per-user, per-repository status. Never stored.
///
/// `release_id`/`seen_at` describe what the user last acknowledged;
/// `is_unseen` says whether something newer is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenStatus {
    pub release_id: Option<ReleaseId>,
    pub seen_at: Option<DateTime<Utc>>,
    pub is_unseen: bool,
}
