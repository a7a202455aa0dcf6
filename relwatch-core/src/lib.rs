//! relwatch-core: release tracking without N+1 lookups
//!
//! Tracks GitHub repositories and reports, per user, whether the latest
//! release of each repository has been seen. The interesting parts live in
//! [`seen`] (the pure seen/unseen join) and [`loader`] (request-scoped
//! batching and coalescing of per-row lookups). Persistence and the GitHub
//! API are collaborators behind the traits in [`store`] and [`provider`].

pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod provider;
pub mod repo_url;
pub mod seen;
pub mod store;
pub mod tracker;

pub use config::TrackerConfig;
pub use context::RequestContext;
pub use error::{ProviderError, Result, StorageError, TrackerError};
pub use models::{
    Release, ReleaseId, ReleaseView, Repository, RepositoryId, RepositoryView, SeenEvent,
    SeenStatus, UserId,
};
pub use tracker::Tracker;
