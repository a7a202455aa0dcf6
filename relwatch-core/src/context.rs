//! Per-request context
//!
//! Owns the caller's identity and one loader of each kind. Build one per
//! inbound request with [`crate::Tracker::context`] and drop it when the
//! request ends; loader caches must never outlive a request or be shared
//! between users.

use std::sync::Arc;

use crate::error::StorageError;
use crate::loader::{BatchLoader, ReleaseBatch, SeenStatusBatch};
use crate::models::{Release, RepositoryId, SeenStatus, UserId};
use crate::store::Store;

pub struct RequestContext {
    user_id: Option<UserId>,
    releases: BatchLoader<ReleaseBatch>,
    seen: BatchLoader<SeenStatusBatch>,
}

impl RequestContext {
    pub fn new(store: Arc<dyn Store>, user_id: Option<UserId>, yield_count: usize) -> Self {
        let releases = BatchLoader::new("latest_release", ReleaseBatch::new(Arc::clone(&store)))
            .with_yield_count(yield_count);
        let seen = BatchLoader::new("seen_status", SeenStatusBatch::new(store, user_id.clone()))
            .with_yield_count(yield_count);

        Self {
            user_id,
            releases,
            seen,
        }
    }

    /// Caller identity; `None` is the anonymous user.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub async fn latest_release(&self, id: RepositoryId) -> Result<Option<Release>, StorageError> {
        self.releases.load(id).await
    }

    /// Seen status for the context's user. Every repository has one.
    pub async fn seen_status(&self, id: RepositoryId) -> Result<SeenStatus, StorageError> {
        Ok(self.seen.load(id).await?.unwrap_or_default())
    }
}
