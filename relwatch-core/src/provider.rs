//! Repository metadata provider contract
//!
//! The real implementation (GitHub REST) lives in `relwatch-server`.
//! [`MockProvider`] serves canned responses for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ProviderError;

/// Repository metadata from upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub url: String,
    pub description: Option<String>,
}

/// Latest published release from upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
    pub notes: Option<String>,
}

/// Source of repository and release metadata (testable)
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fails with [`ProviderError::NotFound`] if the repository does not exist.
    async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoMetadata, ProviderError>;

    /// Fails with [`ProviderError::NotFound`] if the repository has no releases.
    async fn get_latest_release(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<ReleaseMetadata, ProviderError>;
}

/// Mock provider for testing. Unknown repositories and repositories without
/// a configured release answer [`ProviderError::NotFound`].
#[derive(Default)]
pub struct MockProvider {
    repos: Mutex<HashMap<String, Result<RepoMetadata, ProviderError>>>,
    releases: Mutex<HashMap<String, Result<ReleaseMetadata, ProviderError>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository that exists upstream.
    pub fn add_repo(&self, owner: &str, name: &str, description: Option<&str>) {
        let meta = RepoMetadata {
            url: format!("https://github.com/{owner}/{name}"),
            description: description.map(str::to_owned),
        };
        Self::slot(&self.repos).insert(key(owner, name), Ok(meta));
    }

    /// Make the repository lookup fail.
    pub fn fail_repo(&self, owner: &str, name: &str, err: ProviderError) {
        Self::slot(&self.repos).insert(key(owner, name), Err(err));
    }

    /// Set the release returned as latest.
    pub fn set_latest_release(&self, owner: &str, name: &str, release: ReleaseMetadata) {
        Self::slot(&self.releases).insert(key(owner, name), Ok(release));
    }

    /// Make the latest-release lookup fail.
    pub fn fail_latest_release(&self, owner: &str, name: &str, err: ProviderError) {
        Self::slot(&self.releases).insert(key(owner, name), Err(err));
    }

    /// Total number of provider calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn slot<V>(map: &Mutex<HashMap<String, V>>) -> std::sync::MutexGuard<'_, HashMap<String, V>> {
        map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

#[async_trait]
impl MetadataProvider for MockProvider {
    async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoMetadata, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::slot(&self.repos)
            .get(&key(owner, name))
            .cloned()
            .unwrap_or(Err(ProviderError::NotFound))
    }

    async fn get_latest_release(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<ReleaseMetadata, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::slot(&self.releases)
            .get(&key(owner, name))
            .cloned()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}
