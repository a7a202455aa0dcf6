//! Row-level data access
//!
//! Each repository follows these patterns:
//! - Bulk lookups take id slices and return sparse maps (no N+1)
//! - Upserts use ON CONFLICT ... RETURNING (no check-then-insert)
//! - Query functions are generic over the executor, so the same SQL runs
//!   on the pool or inside a transaction

pub mod releases;
pub mod repositories;
pub mod seen;

use relwatch_core::StorageError;
use sqlx::error::ErrorKind;

pub use releases::ReleaseRepo;
pub use repositories::RepositoryRepo;
pub use seen::SeenRepo;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    /// Unique, foreign key, not-null or check violation
    #[error("constraint {constraint} violated: {message}")]
    Constraint { constraint: String, message: String },
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if !matches!(db_err.kind(), ErrorKind::Other) {
                return Self::Constraint {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        Self::Sqlx(err)
    }
}

impl From<DbError> for StorageError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(inner) => StorageError::database(inner),
            constraint @ DbError::Constraint { .. } => {
                StorageError::constraint(constraint.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_stay_sqlx() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::RowNotFound)));

        let storage = StorageError::from(err);
        assert!(matches!(storage, StorageError::Database(_)));
    }

    #[test]
    fn constraint_maps_to_storage_constraint() {
        let err = DbError::Constraint {
            constraint: "releases_repository_id_fkey".into(),
            message: "insert violates foreign key".into(),
        };
        let storage = StorageError::from(err);
        assert!(
            matches!(storage, StorageError::Constraint(ref m) if m.contains("releases_repository_id_fkey"))
        );
    }
}
