//! Store contracts
//!
//! Each trait owns one kind of row:
//! - [`RepositoryStore`]: tracked repositories, natural key `(owner, name)`
//! - [`ReleaseStore`]: releases, natural key `(repository_id, tag_name)`
//! - [`SeenStore`]: seen events, key `(user_id, repository_id, release_id)`
//!
//! Bulk lookups return sparse maps: ids without a row are absent, never
//! mapped to an explicit "none". Upserts return the final row.
//!
//! [`Store`] ties the three together and adds transactions for ingestion.
//! The Postgres implementation lives in `relwatch-server`; [`MemoryStore`]
//! has the same semantics and backs tests and `serve --memory`.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{
    NewRelease, NewRepository, Release, ReleaseId, Repository, RepositoryId, SeenEvent, UserId,
};

pub use memory::MemoryStore;

/// Tracked repository rows
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// All repositories, most recently updated first.
    async fn get_all_repositories(&self) -> Result<Vec<Repository>, StorageError>;

    async fn get_repository_by_id(
        &self,
        id: RepositoryId,
    ) -> Result<Option<Repository>, StorageError>;

    /// Insert, or on `(owner, name)` conflict overwrite description/url and
    /// bump `updated_at`.
    async fn upsert_repository(&self, new: &NewRepository) -> Result<Repository, StorageError>;
}

/// Release rows
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn get_latest_for_repository(
        &self,
        repository_id: RepositoryId,
    ) -> Result<Option<Release>, StorageError>;

    /// Latest release per repository. Repositories without releases are absent.
    async fn get_latest_for_repositories(
        &self,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, Release>, StorageError>;

    /// Any release by id, latest or superseded.
    async fn get_release_by_id(&self, id: ReleaseId) -> Result<Option<Release>, StorageError>;

    /// Insert, or on `(repository_id, tag_name)` conflict overwrite
    /// `published_at`, `notes` and `html_url`.
    async fn upsert_release(&self, new: &NewRelease) -> Result<Release, StorageError>;
}

/// Seen event rows. `None` user is the anonymous partition.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn get_last_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
    ) -> Result<Option<SeenEvent>, StorageError>;

    /// Last seen event per repository. Repositories never marked are absent.
    async fn get_last_seen_for_repositories(
        &self,
        user_id: Option<&UserId>,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, SeenEvent>, StorageError>;

    /// Insert if absent; always returns the persisted event, so a repeated
    /// mark yields the original `seen_at`.
    async fn mark_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
        release_id: ReleaseId,
    ) -> Result<SeenEvent, StorageError>;
}

/// Full store with transactional upserts
#[async_trait]
pub trait Store: RepositoryStore + ReleaseStore + SeenStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError>;
}

/// Unit of work spanning a repository upsert and a release upsert.
///
/// Dropping without [`StoreTransaction::commit`] rolls back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn upsert_repository(&mut self, new: &NewRepository) -> Result<Repository, StorageError>;

    async fn upsert_release(&mut self, new: &NewRelease) -> Result<Release, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
