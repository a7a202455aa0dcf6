//! In-memory store
//!
//! Same contract as the Postgres store: natural-key upserts, sparse bulk
//! lookups, idempotent seen marks, and all-or-nothing transactions. Bulk
//! results are built from hash maps, so callers cannot rely on row order.
//!
//! A transaction holds the state lock until it commits or is dropped; a
//! dropped transaction restores the snapshot taken at `begin`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ReleaseStore, RepositoryStore, SeenStore, Store, StoreTransaction};
use crate::error::StorageError;
use crate::models::{
    NewRelease, NewRepository, Release, ReleaseId, Repository, RepositoryId, SeenEvent, UserId,
};

#[derive(Debug, Clone, Default)]
struct State {
    repositories: BTreeMap<RepositoryId, Repository>,
    releases: BTreeMap<ReleaseId, Release>,
    seen: Vec<SeenEvent>,
    next_repository_id: i64,
    next_release_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing timestamps so ordering by time is deterministic.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn upsert_repository(&mut self, new: &NewRepository) -> Repository {
        let now = self.stamp();

        if let Some(existing) = self
            .repositories
            .values_mut()
            .find(|r| r.owner == new.owner && r.name == new.name)
        {
            existing.description = new.description.clone();
            existing.url = new.url.clone();
            existing.updated_at = now;
            return existing.clone();
        }

        self.next_repository_id += 1;
        let repo = Repository {
            id: RepositoryId(self.next_repository_id),
            owner: new.owner.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            url: new.url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.repositories.insert(repo.id, repo.clone());
        repo
    }

    fn upsert_release(&mut self, new: &NewRelease) -> Result<Release, StorageError> {
        if !self.repositories.contains_key(&new.repository_id) {
            return Err(StorageError::constraint(format!(
                "release references unknown repository {}",
                new.repository_id
            )));
        }

        if let Some(existing) = self
            .releases
            .values_mut()
            .find(|r| r.repository_id == new.repository_id && r.tag_name == new.tag_name)
        {
            existing.published_at = new.published_at;
            existing.notes = new.notes.clone();
            existing.html_url = new.html_url.clone();
            return Ok(existing.clone());
        }

        self.next_release_id += 1;
        let release = Release {
            id: ReleaseId(self.next_release_id),
            repository_id: new.repository_id,
            tag_name: new.tag_name.clone(),
            published_at: new.published_at,
            notes: new.notes.clone(),
            html_url: new.html_url.clone(),
        };
        self.releases.insert(release.id, release.clone());
        Ok(release)
    }

    fn latest_for(&self, repository_id: RepositoryId) -> Option<&Release> {
        Release::latest(
            self.releases
                .values()
                .filter(|r| r.repository_id == repository_id),
        )
    }

    fn last_seen(&self, user_id: Option<&UserId>, repository_id: RepositoryId) -> Option<&SeenEvent> {
        self.seen
            .iter()
            .filter(|e| e.user_id.as_ref() == user_id && e.repository_id == repository_id)
            .max_by(|a, b| a.cmp_recency(b))
    }
}

/// In-memory [`Store`] with per-operation call counters.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    calls: Arc<StdMutex<HashMap<&'static str, usize>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `op` (a trait method name) has been called.
    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    /// Make every subsequent operation fail with a storage error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn enter(&self, op: &'static str) -> Result<(), StorageError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_insert(0) += 1;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::database(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "memory store marked unavailable",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn get_all_repositories(&self) -> Result<Vec<Repository>, StorageError> {
        self.enter("get_all_repositories")?;
        let state = self.state.lock().await;
        let mut repos: Vec<Repository> = state.repositories.values().cloned().collect();
        repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(repos)
    }

    async fn get_repository_by_id(
        &self,
        id: RepositoryId,
    ) -> Result<Option<Repository>, StorageError> {
        self.enter("get_repository_by_id")?;
        Ok(self.state.lock().await.repositories.get(&id).cloned())
    }

    async fn upsert_repository(&self, new: &NewRepository) -> Result<Repository, StorageError> {
        self.enter("upsert_repository")?;
        Ok(self.state.lock().await.upsert_repository(new))
    }
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    async fn get_latest_for_repository(
        &self,
        repository_id: RepositoryId,
    ) -> Result<Option<Release>, StorageError> {
        self.enter("get_latest_for_repository")?;
        Ok(self.state.lock().await.latest_for(repository_id).cloned())
    }

    async fn get_latest_for_repositories(
        &self,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, Release>, StorageError> {
        self.enter("get_latest_for_repositories")?;
        let state = self.state.lock().await;
        Ok(repository_ids
            .iter()
            .filter_map(|id| state.latest_for(*id).map(|r| (*id, r.clone())))
            .collect())
    }

    async fn get_release_by_id(&self, id: ReleaseId) -> Result<Option<Release>, StorageError> {
        self.enter("get_release_by_id")?;
        Ok(self.state.lock().await.releases.get(&id).cloned())
    }

    async fn upsert_release(&self, new: &NewRelease) -> Result<Release, StorageError> {
        self.enter("upsert_release")?;
        self.state.lock().await.upsert_release(new)
    }
}

#[async_trait]
impl SeenStore for MemoryStore {
    async fn get_last_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
    ) -> Result<Option<SeenEvent>, StorageError> {
        self.enter("get_last_seen")?;
        Ok(self
            .state
            .lock()
            .await
            .last_seen(user_id, repository_id)
            .cloned())
    }

    async fn get_last_seen_for_repositories(
        &self,
        user_id: Option<&UserId>,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, SeenEvent>, StorageError> {
        self.enter("get_last_seen_for_repositories")?;
        let state = self.state.lock().await;
        Ok(repository_ids
            .iter()
            .filter_map(|id| state.last_seen(user_id, *id).map(|e| (*id, e.clone())))
            .collect())
    }

    async fn mark_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
        release_id: ReleaseId,
    ) -> Result<SeenEvent, StorageError> {
        self.enter("mark_seen")?;
        let mut state = self.state.lock().await;

        if let Some(existing) = state.seen.iter().find(|e| {
            e.user_id.as_ref() == user_id
                && e.repository_id == repository_id
                && e.release_id == release_id
        }) {
            return Ok(existing.clone());
        }

        if !state.repositories.contains_key(&repository_id) {
            return Err(StorageError::constraint(format!(
                "seen event references unknown repository {repository_id}"
            )));
        }

        let event = SeenEvent {
            user_id: user_id.cloned(),
            repository_id,
            release_id,
            seen_at: state.stamp(),
        };
        state.seen.push(event.clone());
        Ok(event)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        self.enter("begin")?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = State::clone(&guard);
        Ok(Box::new(MemoryTransaction {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    /// `Some` until committed; restored on drop.
    snapshot: Option<State>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn upsert_repository(&mut self, new: &NewRepository) -> Result<Repository, StorageError> {
        Ok(self.guard.upsert_repository(new))
    }

    async fn upsert_release(&mut self, new: &NewRelease) -> Result<Release, StorageError> {
        self.guard.upsert_release(new)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        drop(self);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}
