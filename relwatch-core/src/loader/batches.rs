//! The two per-request lookup kinds
//!
//! - [`ReleaseBatch`]: latest release by repository id
//! - [`SeenStatusBatch`]: seen status by repository id for one user,
//!   joining two bulk store calls made in parallel

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::BatchFn;
use crate::error::StorageError;
use crate::models::{Release, RepositoryId, SeenStatus, UserId};
use crate::seen;
use crate::store::Store;

/// Latest release per repository
pub struct ReleaseBatch {
    store: Arc<dyn Store>,
}

impl ReleaseBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn for ReleaseBatch {
    type Key = RepositoryId;
    type Value = Release;

    async fn load(
        &self,
        keys: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, Release>, StorageError> {
        self.store.get_latest_for_repositories(keys).await
    }
}

/// Seen status per repository, scoped to one user.
///
/// Every requested key gets a status, since "no release and never seen" is
/// itself a status.
pub struct SeenStatusBatch {
    store: Arc<dyn Store>,
    user_id: Option<UserId>,
}

impl SeenStatusBatch {
    pub fn new(store: Arc<dyn Store>, user_id: Option<UserId>) -> Self {
        Self { store, user_id }
    }
}

#[async_trait]
impl BatchFn for SeenStatusBatch {
    type Key = RepositoryId;
    type Value = SeenStatus;

    async fn load(
        &self,
        keys: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, SeenStatus>, StorageError> {
        let (last_seen, latest) = tokio::try_join!(
            self.store
                .get_last_seen_for_repositories(self.user_id.as_ref(), keys),
            self.store.get_latest_for_repositories(keys),
        )?;

        Ok(keys
            .iter()
            .map(|id| (*id, seen::resolve(latest.get(id), last_seen.get(id))))
            .collect())
    }
}
