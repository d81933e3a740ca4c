//! Recoverable, user-facing mutation outcomes.
//!
//! Validation errors are data, not control flow: a batch collects them and
//! returns them alongside whatever did apply. Fatal conditions (store
//! failures, insufficient closures) use the error types of the crates that
//! raise them instead.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A mutation entry that could not be applied.
///
/// Collected per batch and returned in the response; the entry that
/// produced the error is skipped, the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A referenced node does not exist: a reorder anchor, an edit target,
    /// a delete target, or a node named in `insert_ids`.
    #[error("node {id} not found ({context})")]
    NotFound { id: NodeId, context: String },

    /// A create or reparent names a parent that exists neither in the
    /// store nor among the batch's own creates.
    #[error("node {id} references missing parent {parent_id}")]
    DanglingParent { id: NodeId, parent_id: NodeId },
}

impl ValidationError {
    /// A not-found error with a short context tag (e.g. `"anchor"`).
    #[must_use]
    pub fn not_found(id: NodeId, context: impl Into<String>) -> Self {
        Self::NotFound {
            id,
            context: context.into(),
        }
    }

    /// A dangling-parent error for `id` pointing at `parent_id`.
    #[must_use]
    pub const fn dangling_parent(id: NodeId, parent_id: NodeId) -> Self {
        Self::DanglingParent { id, parent_id }
    }
}
