//! Release rows
//!
//! "Latest" is the greatest `published_at`, nulls last, ties broken by the
//! greatest id. The bulk lookup picks it per repository with `DISTINCT ON`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relwatch_core::models::{NewRelease, Release, ReleaseId, RepositoryId};
use sqlx::{FromRow, PgExecutor, PgPool};

use super::DbError;

#[derive(Debug, FromRow)]
struct ReleaseRow {
    id: i64,
    repository_id: i64,
    tag_name: String,
    published_at: Option<DateTime<Utc>>,
    release_notes: Option<String>,
    html_url: Option<String>,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Self {
            id: ReleaseId(row.id),
            repository_id: RepositoryId(row.repository_id),
            tag_name: row.tag_name,
            published_at: row.published_at,
            notes: row.release_notes,
            html_url: row.html_url,
        }
    }
}

/// Release table access
pub struct ReleaseRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReleaseRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_latest_for_repository(
        &self,
        repository_id: RepositoryId,
    ) -> Result<Option<Release>, DbError> {
        let row = sqlx::query_as::<_, ReleaseRow>(
            r#"
            SELECT id, repository_id, tag_name, published_at, release_notes, html_url
            FROM releases
            WHERE repository_id = $1
            ORDER BY published_at DESC NULLS LAST, id DESC
            LIMIT 1
            "#,
        )
        .bind(repository_id.get())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Release::from))
    }

    /// One query for any number of repositories. Repositories without
    /// releases are absent from the result.
    pub async fn get_latest_for_repositories(
        &self,
        repository_ids: &[RepositoryId],
    ) -> Result<HashMap<RepositoryId, Release>, DbError> {
        if repository_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<i64> = repository_ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query_as::<_, ReleaseRow>(
            r#"
            SELECT DISTINCT ON (repository_id)
                id, repository_id, tag_name, published_at, release_notes, html_url
            FROM releases
            WHERE repository_id = ANY($1)
            ORDER BY repository_id, published_at DESC NULLS LAST, id DESC
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        tracing::trace!(requested = repository_ids.len(), found = rows.len(), "bulk latest releases");
        Ok(rows
            .into_iter()
            .map(|row| (RepositoryId(row.repository_id), Release::from(row)))
            .collect())
    }

    pub async fn get_by_id(&self, id: ReleaseId) -> Result<Option<Release>, DbError> {
        let row = sqlx::query_as::<_, ReleaseRow>(
            r#"
            SELECT id, repository_id, tag_name, published_at, release_notes, html_url
            FROM releases
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Release::from))
    }

    pub async fn upsert(&self, new: &NewRelease) -> Result<Release, DbError> {
        upsert(self.pool, new).await
    }
}

/// Insert or update on `(repository_id, tag_name)`. Only `published_at`,
/// `release_notes` and `html_url` change on conflict.
pub(crate) async fn upsert<'e, E>(executor: E, new: &NewRelease) -> Result<Release, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ReleaseRow>(
        r#"
        INSERT INTO releases (repository_id, tag_name, published_at, release_notes, html_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (repository_id, tag_name)
        DO UPDATE SET published_at = EXCLUDED.published_at,
                      release_notes = EXCLUDED.release_notes,
                      html_url = EXCLUDED.html_url
        RETURNING id, repository_id, tag_name, published_at, release_notes, html_url
        "#,
    )
    .bind(new.repository_id.get())
    .bind(&new.tag_name)
    .bind(new.published_at)
    .bind(&new.notes)
    .bind(&new.html_url)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::RepositoryRepo;
    use crate::db::testing::{migrated_pool, unique_repo};
    use chrono::TimeZone;

    fn release(repository_id: RepositoryId, tag: &str, day: Option<u32>) -> NewRelease {
        NewRelease {
            repository_id,
            tag_name: tag.into(),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()),
            notes: None,
            html_url: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn upsert_overwrites_one_row() {
        let pool = migrated_pool().await;
        let repo = RepositoryRepo::new(&pool).upsert(&unique_repo("rel")).await.unwrap();
        let releases = ReleaseRepo::new(&pool);

        let first = releases.upsert(&release(repo.id, "v1", Some(1))).await.unwrap();
        let mut update = release(repo.id, "v1", Some(2));
        update.notes = Some("notes".into());
        let second = releases.upsert(&update).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.published_at, update.published_at);
        assert_eq!(second.notes.as_deref(), Some("notes"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn bulk_latest_prefers_newest_and_skips_empty() {
        let pool = migrated_pool().await;
        let repos = RepositoryRepo::new(&pool);
        let with = repos.upsert(&unique_repo("with")).await.unwrap();
        let without = repos.upsert(&unique_repo("without")).await.unwrap();
        let releases = ReleaseRepo::new(&pool);

        releases.upsert(&release(with.id, "undated", None)).await.unwrap();
        releases.upsert(&release(with.id, "old", Some(1))).await.unwrap();
        let newest = releases.upsert(&release(with.id, "new", Some(9))).await.unwrap();

        let latest = releases
            .get_latest_for_repositories(&[with.id, without.id])
            .await
            .unwrap();

        assert_eq!(latest.get(&with.id).map(|r| r.id), Some(newest.id));
        assert!(!latest.contains_key(&without.id));
        let single = releases.get_latest_for_repository(with.id).await.unwrap();
        assert_eq!(single.map(|r| r.id), Some(newest.id));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn release_for_unknown_repository_is_constraint_error() {
        let pool = migrated_pool().await;
        let err = ReleaseRepo::new(&pool)
            .upsert(&release(RepositoryId(-1), "v1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint { .. }));
    }
}
