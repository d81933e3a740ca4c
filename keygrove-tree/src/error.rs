//! Error types for hierarchy and reorder computations.

use keygrove_types::NodeId;
use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Fatal precondition violations in tree computations.
///
/// These mean the caller handed over a broken working set, not that user
/// input was bad; recoverable per-entry problems are reported as
/// `ValidationError` values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A parent link points at a node absent from the loaded set.
    /// The caller did not load a sufficient closure.
    #[error("node {id} referenced but not loaded")]
    MissingNode { id: NodeId },

    /// Following parent links revisited a node; the stored graph is not a
    /// tree.
    #[error("parent cycle through node {id}")]
    CycleDetected { id: NodeId },
}
