//! Error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A data store operation failed.
    #[error("A data store operation failed: {0}")]
    OperationFailed(#[from] sqlx::Error),

    /// An error occurred during serialization or deserialization of a state
    /// payload.
    #[error("Failed to serialize or deserialize state: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A database migration failed.
    #[error("A data migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
