//! Postgres-backed [`Store`]

use std::collections::HashMap;

use async_trait::async_trait;
use relwatch_core::models::{
    NewRelease, NewRepository, Release, ReleaseId, Repository, RepositoryId, SeenEvent, UserId,
};
use relwatch_core::store::{ReleaseStore, RepositoryStore, SeenStore, Store, StoreTransaction};
use relwatch_core::StorageError;
use sqlx::{PgPool, Postgres, Transaction};

use super::repos::{releases, repositories, ReleaseRepo, RepositoryRepo, SeenRepo};

/// Store over a connection pool. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RepositoryStore for PgStore {
    async fn get_all_repositories(&self) -> Result<Vec<Repository>, StorageError> {
        Ok(RepositoryRepo::new(&self.pool).get_all().await?)
    }

    async fn get_repository_by_id(
        &self,
        id: RepositoryId,
    ) -> Result<Option<Repository>, StorageError> {
        Ok(RepositoryRepo::new(&self.pool).get_by_id(id).await?)
    }

    async fn upsert_repository(&self, new: &NewRepository) -> Result<Repository, StorageError> {
        Ok(RepositoryRepo::new(&self.pool).upsert(new).await?)
    }
}

#[async_trait]
impl ReleaseStore for PgStore {
    async fn get_latest_for_repository(
        &self,
        repository_id: RepositoryId,
    ) -> Result<Option<Release>, StorageError> {
        Ok(ReleaseRepo::new(&self.pool)
            .get_latest_for_repository(repository_id)
            .await?)
    }

    async fn get_latest_for_repositories(
        &self,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, Release>, StorageError> {
        Ok(ReleaseRepo::new(&self.pool)
            .get_latest_for_repositories(repository_ids)
            .await?)
    }

    async fn get_release_by_id(&self, id: ReleaseId) -> Result<Option<Release>, StorageError> {
        Ok(ReleaseRepo::new(&self.pool).get_by_id(id).await?)
    }

    async fn upsert_release(&self, new: &NewRelease) -> Result<Release, StorageError> {
        Ok(ReleaseRepo::new(&self.pool).upsert(new).await?)
    }
}

#[async_trait]
impl SeenStore for PgStore {
    async fn get_last_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
    ) -> Result<Option<SeenEvent>, StorageError> {
        Ok(SeenRepo::new(&self.pool)
            .get_last_seen(user_id, repository_id)
            .await?)
    }

    async fn get_last_seen_for_repositories(
        &self,
        user_id: Option<&UserId>,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, SeenEvent>, StorageError> {
        Ok(SeenRepo::new(&self.pool)
            .get_last_seen_for_repositories(user_id, repository_ids)
            .await?)
    }

    async fn mark_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
        release_id: ReleaseId,
    ) -> Result<SeenEvent, StorageError> {
        Ok(SeenRepo::new(&self.pool)
            .mark_seen(user_id, repository_id, release_id)
            .await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        let tx = self.pool.begin().await.map_err(StorageError::database)?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// sqlx rolls an uncommitted transaction back when it is dropped.
struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn upsert_repository(&mut self, new: &NewRepository) -> Result<Repository, StorageError> {
        Ok(repositories::upsert(&mut *self.tx, new).await?)
    }

    async fn upsert_release(&mut self, new: &NewRelease) -> Result<Release, StorageError> {
        Ok(releases::upsert(&mut *self.tx, new).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await.map_err(StorageError::database)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.rollback().await.map_err(StorageError::database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{migrated_pool, unique_repo};

    #[tokio::test]
    #[ignore = "requires database"]
    async fn dropped_transaction_rolls_back() {
        let store = PgStore::new(migrated_pool().await);
        let new = unique_repo("tx");

        let repo_id = {
            let mut tx = store.begin().await.unwrap();
            tx.upsert_repository(&new).await.unwrap().id
        };

        assert!(store.get_repository_by_id(repo_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn committed_transaction_is_visible() {
        let store = PgStore::new(migrated_pool().await);

        let mut tx = store.begin().await.unwrap();
        let repo = tx.upsert_repository(&unique_repo("tx-commit")).await.unwrap();
        tx.upsert_release(&NewRelease {
            repository_id: repo.id,
            tag_name: "v1".into(),
            published_at: None,
            notes: None,
            html_url: None,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let latest = store.get_latest_for_repository(repo.id).await.unwrap();
        assert_eq!(latest.map(|r| r.tag_name), Some("v1".to_string()));
    }
}
