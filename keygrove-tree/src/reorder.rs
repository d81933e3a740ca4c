//! Sibling reordering.
//!
//! A [`ChangeOrder`] moves nodes to a position relative to an anchor within
//! the anchor's sibling group. Planning is a pure function over a snapshot
//! of loaded nodes: it emits the minimal `order_index` / `parent_id` edits
//! and never touches storage. Entries of one batch all read the same
//! snapshot; their edits are accumulated downstream, so overlapping entries
//! are last-write-wins on shared targets.

use crate::NodeSet;
use keygrove_types::{ChangeOrder, NodeEdit, NodeId, NodePatch, Patch, PolicyNode, ValidationError};
use std::collections::HashSet;

/// The nodes one mutation batch's reorders operate on.
///
/// Holds the loaded working set (anchors, inserts, and the full sibling
/// group of every anchor's parent) plus the batch-wide set of insert ids.
/// A sibling named as an insert anywhere in the batch is excluded from
/// every entry's kept subset: it is being repositioned by some entry,
/// renumbering it in place would duplicate it.
#[derive(Debug, Clone)]
pub struct ReorderSnapshot {
    nodes: NodeSet,
    batch_insert_ids: HashSet<NodeId>,
}

/// What one [`ChangeOrder`] entry produces: edits to accumulate and
/// validation errors to report. Both can be non-empty at once, e.g. when
/// some insert ids resolve and others do not.
#[derive(Debug, Clone, Default)]
pub struct ReorderPlan {
    pub edits: Vec<NodeEdit>,
    pub errors: Vec<ValidationError>,
}

impl ReorderSnapshot {
    /// Builds the snapshot for one batch of change orders.
    #[must_use]
    pub fn new(nodes: NodeSet, orders: &[ChangeOrder]) -> Self {
        let batch_insert_ids = orders
            .iter()
            .flat_map(|order| order.insert_ids.iter().copied())
            .collect();

        Self {
            nodes,
            batch_insert_ids,
        }
    }

    /// The loaded working set.
    #[must_use]
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Plans the edits for one change-order entry.
    ///
    /// A missing anchor invalidates only this entry: the plan carries a
    /// `NotFound` error and no edits, and the caller moves on to the next
    /// entry. Missing insert ids are each reported and skipped while the
    /// rest of the entry still applies.
    #[must_use]
    pub fn plan(&self, order: &ChangeOrder) -> ReorderPlan {
        let mut plan = ReorderPlan::default();

        let Some(anchor) = self.nodes.get(order.start_id) else {
            plan.errors
                .push(ValidationError::not_found(order.start_id, "anchor"));
            return plan;
        };

        let start_index = if order.is_after {
            anchor.order_index + 1
        } else {
            anchor.order_index
        };

        let inserts = self.resolve_inserts(order, &mut plan.errors);
        let kept = self.kept_siblings(anchor, order.is_after);

        let mut next_index = start_index;
        for node in inserts.into_iter().chain(kept) {
            let mut patch = NodePatch::new();

            if node.order_index != next_index {
                patch.order_index = Patch::Set(next_index);
            }
            if node.parent_id != anchor.parent_id {
                patch.parent_id = Patch::Set(anchor.parent_id);
            }
            if !patch.is_empty() {
                plan.edits.push(NodeEdit::new(node.id, patch));
            }

            next_index += 1;
        }

        plan
    }

    /// Resolves an entry's insert ids against the snapshot, in caller
    /// order, first occurrence wins for duplicates.
    fn resolve_inserts(
        &self,
        order: &ChangeOrder,
        errors: &mut Vec<ValidationError>,
    ) -> Vec<&PolicyNode> {
        let mut seen = HashSet::with_capacity(order.insert_ids.len());
        let mut inserts = Vec::with_capacity(order.insert_ids.len());

        for &id in &order.insert_ids {
            if !seen.insert(id) {
                continue;
            }
            match self.nodes.get(id) {
                Some(node) => inserts.push(node),
                None => errors.push(ValidationError::not_found(id, "insert")),
            }
        }

        inserts
    }

    /// The anchor's siblings that stay in place-relative order: those at or
    /// past the insertion point, minus any the batch repositions.
    ///
    /// Ascending `order_index`; ties keep load order. Duplicate indices can
    /// occur between batches and are tolerated, the walk renumbers them
    /// contiguously.
    fn kept_siblings(&self, anchor: &PolicyNode, is_after: bool) -> Vec<&PolicyNode> {
        let mut kept: Vec<&PolicyNode> = self
            .nodes
            .iter()
            .filter(|node| node.parent_id == anchor.parent_id)
            .filter(|node| {
                if is_after {
                    node.order_index > anchor.order_index
                } else {
                    node.order_index >= anchor.order_index
                }
            })
            .filter(|node| !self.batch_insert_ids.contains(&node.id))
            .collect();

        kept.sort_by_key(|node| node.order_index);
        kept
    }
}
