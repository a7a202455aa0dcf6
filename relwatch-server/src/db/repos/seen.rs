//! Seen events (`repository_seen`)
//!
//! The anonymous user is stored as NULL. The unique constraint treats NULLs
//! as equal and every lookup compares with `IS NOT DISTINCT FROM`, so the
//! anonymous user is one partition like any named user.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relwatch_core::models::{ReleaseId, RepositoryId, SeenEvent, UserId};
use sqlx::{FromRow, PgPool};

use super::DbError;

#[derive(Debug, FromRow)]
struct SeenRow {
    user_id: Option<String>,
    repository_id: i64,
    release_id: i64,
    seen_at: DateTime<Utc>,
}

impl From<SeenRow> for SeenEvent {
    fn from(row: SeenRow) -> Self {
        Self {
            user_id: UserId::from_raw(row.user_id.as_deref()),
            repository_id: RepositoryId(row.repository_id),
            release_id: ReleaseId(row.release_id),
            seen_at: row.seen_at,
        }
    }
}

/// Seen event table access
pub struct SeenRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SeenRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_last_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
    ) -> Result<Option<SeenEvent>, DbError> {
        let row = sqlx::query_as::<_, SeenRow>(
            r#"
            SELECT user_id, repository_id, release_id, seen_at
            FROM repository_seen
            WHERE repository_id = $1 AND user_id IS NOT DISTINCT FROM $2
            ORDER BY seen_at DESC, release_id DESC
            LIMIT 1
            "#,
        )
        .bind(repository_id.get())
        .bind(user_id.map(UserId::as_str))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(SeenEvent::from))
    }

    /// One query for any number of repositories. Repositories the user never
    /// marked are absent from the result.
    pub async fn get_last_seen_for_repositories(
        &self,
        user_id: Option<&UserId>,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, SeenEvent>, DbError> {
        if repository_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<i64> = repository_ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query_as::<_, SeenRow>(
            r#"
            SELECT DISTINCT ON (repository_id)
                user_id, repository_id, release_id, seen_at
            FROM repository_seen
            WHERE repository_id = ANY($1) AND user_id IS NOT DISTINCT FROM $2
            ORDER BY repository_id, seen_at DESC, release_id DESC
            "#,
        )
        .bind(ids)
        .bind(user_id.map(UserId::as_str))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (RepositoryId(row.repository_id), SeenEvent::from(row)))
            .collect())
    }

    /// Insert if absent and return the persisted event.
    ///
    /// On conflict the no-op update locks the existing row and returns it
    /// with its original `seen_at`, including when a concurrent insert of the
    /// same triple committed after this statement's snapshot was taken.
    pub async fn mark_seen(
        &self,
        user_id: Option<&UserId>,
        repository_id: RepositoryId,
        release_id: ReleaseId,
    ) -> Result<SeenEvent, DbError> {
        let row = sqlx::query_as::<_, SeenRow>(
            r#"
            INSERT INTO repository_seen (user_id, repository_id, release_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, repository_id, release_id)
                DO UPDATE SET seen_at = repository_seen.seen_at
            RETURNING user_id, repository_id, release_id, seen_at
            "#,
        )
        .bind(user_id.map(UserId::as_str))
        .bind(repository_id.get())
        .bind(release_id.get())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::{ReleaseRepo, RepositoryRepo};
    use crate::db::testing::{migrated_pool, unique_repo};
    use relwatch_core::models::NewRelease;

    async fn repo_with_releases(pool: &PgPool, tags: &[&str]) -> (RepositoryId, Vec<ReleaseId>) {
        let repo = RepositoryRepo::new(pool).upsert(&unique_repo("seen")).await.unwrap();
        let mut ids = Vec::new();
        for tag in tags {
            let release = ReleaseRepo::new(pool)
                .upsert(&NewRelease {
                    repository_id: repo.id,
                    tag_name: tag.to_string(),
                    published_at: None,
                    notes: None,
                    html_url: None,
                })
                .await
                .unwrap();
            ids.push(release.id);
        }
        (repo.id, ids)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn mark_seen_twice_keeps_first_timestamp() {
        let pool = migrated_pool().await;
        let (repo, releases) = repo_with_releases(&pool, &["v1"]).await;
        let seen = SeenRepo::new(&pool);
        let user = UserId::from_raw(Some("alice"));

        let first = seen.mark_seen(user.as_ref(), repo, releases[0]).await.unwrap();
        let second = seen.mark_seen(user.as_ref(), repo, releases[0]).await.unwrap();

        assert_eq!(first.seen_at, second.seen_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires database"]
    async fn concurrent_marks_of_one_release_all_succeed() {
        let pool = migrated_pool().await;

        for round in 0..10 {
            let (repo, releases) = repo_with_releases(&pool, &["v1"]).await;
            let user = UserId::from_raw(Some(format!("racer-{round}").as_str()));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let pool = pool.clone();
                    let user = user.clone();
                    let release = releases[0];
                    tokio::spawn(async move {
                        SeenRepo::new(&pool).mark_seen(user.as_ref(), repo, release).await
                    })
                })
                .collect();

            let mut stamps = Vec::new();
            for handle in handles {
                let event = handle.await.unwrap().expect("duplicate mark must not fail");
                stamps.push(event.seen_at);
            }
            stamps.dedup();
            assert_eq!(stamps.len(), 1, "every mark returns the first seen_at");
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn anonymous_marks_are_idempotent_and_partitioned() {
        let pool = migrated_pool().await;
        let (repo, releases) = repo_with_releases(&pool, &["v1", "v2"]).await;
        let seen = SeenRepo::new(&pool);

        let first = seen.mark_seen(None, repo, releases[0]).await.unwrap();
        let again = seen.mark_seen(None, repo, releases[0]).await.unwrap();
        assert_eq!(first.seen_at, again.seen_at);

        seen.mark_seen(UserId::from_raw(Some("bob")).as_ref(), repo, releases[1])
            .await
            .unwrap();

        let anon = seen.get_last_seen(None, repo).await.unwrap().unwrap();
        assert_eq!(anon.release_id, releases[0]);
        assert_eq!(anon.user_id, None);

        let bulk = seen
            .get_last_seen_for_repositories(UserId::from_raw(Some("bob")).as_ref(), &[repo])
            .await
            .unwrap();
        assert_eq!(bulk.get(&repo).map(|e| e.release_id), Some(releases[1]));
    }
}
