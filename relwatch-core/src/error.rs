//! Error taxonomy for relwatch operations.
//!
//! Library code returns [`TrackerError`]; the CLI wraps it in `anyhow` and the
//! HTTP layer maps each variant to a status code. [`StorageError`] is `Clone`
//! because one failed bulk load is fanned out to every waiting caller.

use std::sync::Arc;

use thiserror::Error;

/// Main error type for tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Input was not a usable `https://github.com/<owner>/<name>` URL
    #[error("invalid GitHub repository URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: &'static str },

    /// Referenced repository or release does not exist
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// Request input failed validation
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Upstream metadata provider failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Persistence failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    pub fn invalid_url(input: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason,
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Persistence failure. Cheap to clone so a batch failure can be shared.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(Arc<dyn std::error::Error + Send + Sync>),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("batch load was cancelled before it completed")]
    Cancelled,
}

impl StorageError {
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Arc::new(err))
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}

/// Failure reported by a [`crate::provider::MetadataProvider`].
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// HTTP 404 equivalent. For the latest-release lookup this means
    /// "no releases yet" and is not treated as a failure by ingestion.
    #[error("not found upstream")]
    NotFound,

    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}
