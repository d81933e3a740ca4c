//! Error types for sync operations.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while serving a request.
///
/// These are fatal to the request: the surrounding transaction rolls back
/// and nothing is committed. Recoverable per-entry problems travel as
/// `ValidationError` values inside responses instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The storage layer failed.
    #[error("storage error: {0}")]
    Store(#[from] keygrove_store::StoreError),

    /// The loaded node graph was insufficient or inconsistent.
    #[error("hierarchy error: {0}")]
    Tree(#[from] keygrove_tree::TreeError),

    /// A field value could not be encoded for the event log.
    #[error("event encoding error: {0}")]
    Encoding(#[from] keygrove_types::Error),

    /// The caller cancelled the request before it completed.
    #[error("operation cancelled")]
    Cancelled,
}
