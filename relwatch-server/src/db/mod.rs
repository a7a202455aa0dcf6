//! Database layer - connection pool, migrations, repositories, store
//!
//! # Design Principles
//!
//! - Connection pool, no shared connection behind a mutex
//! - Bulk lookups use `DISTINCT ON` + `= ANY($1)`: one query per batch
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - Ingestion upserts share one transaction

pub mod migrations;
pub mod pool;
pub mod repos;
pub mod store;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::{DbError, ReleaseRepo, RepositoryRepo, SeenRepo};
pub use store::PgStore;

#[cfg(test)]
pub(crate) mod testing {
    use relwatch_core::models::NewRepository;
    use sqlx::PgPool;

    /// Pool on `DATABASE_URL` with the schema in place.
    pub async fn migrated_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = super::create_pool(&url).await.expect("pool creation failed");
        super::migrations::run(&pool).await.expect("migrations failed");
        pool
    }

    /// Repository input with a name no other test run uses.
    pub fn unique_repo(tag: &str) -> NewRepository {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let name = format!("{tag}-{nanos}");
        NewRepository {
            owner: "relwatch-test".into(),
            url: format!("https://github.com/relwatch-test/{name}"),
            name,
            description: None,
        }
    }
}
