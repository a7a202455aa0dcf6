//! Tracked repository rows
//!
//! - get_all: newest `updated_at` first
//! - upsert: INSERT with ON CONFLICT (owner, name), bumps `updated_at`

use chrono::{DateTime, Utc};
use relwatch_core::models::{NewRepository, Repository, RepositoryId};
use sqlx::{FromRow, PgExecutor, PgPool};

use super::DbError;

#[derive(Debug, FromRow)]
struct RepositoryRow {
    id: i64,
    owner: String,
    name: String,
    description: Option<String>,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RepositoryRow> for Repository {
    fn from(row: RepositoryRow) -> Self {
        Self {
            id: RepositoryId(row.id),
            owner: row.owner,
            name: row.name,
            description: row.description,
            url: row.url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository table access
pub struct RepositoryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RepositoryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> Result<Vec<Repository>, DbError> {
        let rows = sqlx::query_as::<_, RepositoryRow>(
            r#"
            SELECT id, owner, name, description, url, created_at, updated_at
            FROM repositories
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Repository::from).collect())
    }

    pub async fn get_by_id(&self, id: RepositoryId) -> Result<Option<Repository>, DbError> {
        let row = sqlx::query_as::<_, RepositoryRow>(
            r#"
            SELECT id, owner, name, description, url, created_at, updated_at
            FROM repositories
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Repository::from))
    }

    pub async fn upsert(&self, new: &NewRepository) -> Result<Repository, DbError> {
        upsert(self.pool, new).await
    }
}

/// Insert or update on `(owner, name)`; `created_at` is kept.
pub(crate) async fn upsert<'e, E>(executor: E, new: &NewRepository) -> Result<Repository, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, RepositoryRow>(
        r#"
        INSERT INTO repositories (owner, name, description, url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (owner, name)
        DO UPDATE SET description = EXCLUDED.description,
                      url = EXCLUDED.url,
                      updated_at = NOW()
        RETURNING id, owner, name, description, url, created_at, updated_at
        "#,
    )
    .bind(&new.owner)
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.url)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}
