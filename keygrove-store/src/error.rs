//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage layer.
///
/// Any of these aborts the surrounding transaction; the store never
/// commits a partially applied batch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure, including CHECK constraint violations.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row carries an identifier that does not parse as a UUID.
    #[error("invalid identifier in stored row: {0}")]
    InvalidId(#[from] uuid::Error),
}
