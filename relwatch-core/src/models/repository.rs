//! Tracked repository rows

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RepositoryId;

/// Repository record. `(owner, name)` is the natural key and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepositoryId,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// `owner/name` slug as used by GitHub.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Upsert input keyed on `(owner, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
}
