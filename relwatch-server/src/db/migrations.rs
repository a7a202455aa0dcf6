//! Schema migrations
//!
//! Every statement is idempotent, so running at each startup is safe.
//! `UNIQUE NULLS NOT DISTINCT` needs PostgreSQL 15 or newer.

use sqlx::PgPool;

use super::DbError;

const STATEMENTS: &[(&str, &str)] = &[
    (
        "repositories",
        r#"
        CREATE TABLE IF NOT EXISTS repositories (
            id BIGSERIAL PRIMARY KEY,
            owner TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            url TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT repositories_owner_name_key UNIQUE (owner, name)
        )
        "#,
    ),
    (
        "releases",
        r#"
        CREATE TABLE IF NOT EXISTS releases (
            id BIGSERIAL PRIMARY KEY,
            repository_id BIGINT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
            tag_name TEXT NOT NULL,
            published_at TIMESTAMPTZ,
            release_notes TEXT,
            html_url TEXT,
            CONSTRAINT releases_repository_tag_key UNIQUE (repository_id, tag_name)
        )
        "#,
    ),
    (
        "releases_latest_idx",
        r#"
        CREATE INDEX IF NOT EXISTS releases_latest_idx
            ON releases (repository_id, published_at DESC NULLS LAST, id DESC)
        "#,
    ),
    // no foreign key on release_id: a seen release stays resolvable after
    // it is superseded
    (
        "repository_seen",
        r#"
        CREATE TABLE IF NOT EXISTS repository_seen (
            id BIGSERIAL PRIMARY KEY,
            user_id TEXT,
            repository_id BIGINT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
            release_id BIGINT NOT NULL,
            seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT repository_seen_user_release_key
                UNIQUE NULLS NOT DISTINCT (user_id, repository_id, release_id)
        )
        "#,
    ),
    (
        "repository_seen_last_idx",
        r#"
        CREATE INDEX IF NOT EXISTS repository_seen_last_idx
            ON repository_seen (repository_id, user_id, seen_at DESC)
        "#,
    ),
];

/// Create all tables and indexes that do not exist yet.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("running migrations");

    for (name, sql) in STATEMENTS {
        tracing::debug!(migration = name, "applying");
        sqlx::query(sql).execute(pool).await?;
    }

    tracing::info!(count = STATEMENTS.len(), "migrations applied");
    Ok(())
}
