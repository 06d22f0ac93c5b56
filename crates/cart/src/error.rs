//! Cart error types.

use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The storage backend rejected or failed an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from the PostgreSQL backend.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for cart results.
pub type Result<T> = std::result::Result<T, CartError>;
