//! relwatch-server: Postgres store, GitHub client and HTTP API
//!
//! Wires the collaborators of [`relwatch_core::Tracker`] to real
//! infrastructure and serves the tracker over axum.

pub mod db;
pub mod github;
pub mod http;
pub mod poller;

pub use db::{DbError, PgStore};
pub use github::{GitHubClient, GitHubConfig, GitHubError};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
pub use poller::Poller;

/// Connect to Postgres, apply the schema and return a ready store.
pub async fn connect_store(database_url: &str, max_connections: u32) -> Result<PgStore, DbError> {
    let pool = db::create_pool_with_options(database_url, max_connections).await?;
    db::migrations::run(&pool).await?;
    Ok(PgStore::new(pool))
}
