//! The sibling-move request.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A request to place nodes at a position among an anchor's siblings.
///
/// The nodes named in `insert_ids` are placed, in the given order,
/// immediately before (`is_after = false`) or after (`is_after = true`) the
/// anchor node `start_id` within the anchor's current sibling group, and
/// the affected part of the group is renumbered contiguously. Inserts
/// currently under a different parent are reparented to the anchor's
/// parent by the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrder {
    pub start_id: NodeId,
    pub insert_ids: Vec<NodeId>,
    pub is_after: bool,
}

impl ChangeOrder {
    /// Creates a move placing `insert_ids` before the anchor.
    #[must_use]
    pub fn before(start_id: NodeId, insert_ids: Vec<NodeId>) -> Self {
        Self {
            start_id,
            insert_ids,
            is_after: false,
        }
    }

    /// Creates a move placing `insert_ids` after the anchor.
    #[must_use]
    pub fn after(start_id: NodeId, insert_ids: Vec<NodeId>) -> Self {
        Self {
            start_id,
            insert_ids,
            is_after: true,
        }
    }
}
