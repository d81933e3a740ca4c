//! Applies one mutation batch against an open store session.
//!
//! The four operation kinds run in a fixed order: creates, then sparse
//! edits, then sibling reorders, then deletes. Edits from the middle two
//! phases accumulate in memory, merged per node id last-write-wins, and hit
//! the store in a single update round trip before the deletes. Deleting
//! first would drop nodes the reorder resolution still needs.
//!
//! Validation problems (missing targets, dangling parents) never abort the
//! batch: the offending entry is skipped and reported, everything else
//! still applies, and the caller commits whatever subset succeeded. Only
//! store failures and cancellation abort.

use crate::error::{SyncError, SyncResult};
use crate::protocol::PostRequest;
use keygrove_store::StoreSession;
use keygrove_tree::{NodeSet, ReorderSnapshot};
use keygrove_types::{
    ActorId, ChangeOrder, Event, EventDraft, HybridTimestamp, IdempotencyToken, NodeEdit, NodeId,
    NodePatch, Patch, PolicyNode, SparseEdit, ValidationError,
};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// What one applied batch produced. The events are the batch's own
/// appends, already sequenced by the sink.
#[derive(Debug)]
pub struct BatchOutcome {
    pub validation_errors: Vec<ValidationError>,
    pub created_ids: Vec<NodeId>,
    pub events: Vec<Event>,
}

/// Returns `Cancelled` once the token is triggered. Checked before every
/// store round trip so a cancelled request never starts another one.
pub(crate) fn ensure_live(cancel: &CancellationToken) -> SyncResult<()> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

/// Runs every phase of `request` on `session` without committing.
///
/// The caller owns the transaction: it calls `begin` before and `commit`
/// after, and a dropped session rolls the whole batch back.
pub async fn apply_batch(
    session: &mut dyn StoreSession,
    request: &PostRequest,
    actor_id: ActorId,
    timestamp: HybridTimestamp,
    cancel: &CancellationToken,
) -> SyncResult<BatchOutcome> {
    let mut applier = BatchApplier {
        session,
        cancel,
        actor_id,
        token: request.token,
        timestamp,
        errors: Vec::new(),
        pending_edits: Vec::new(),
        pending_index: HashMap::new(),
        drafts: Vec::new(),
        created: HashSet::new(),
        created_ids: Vec::new(),
    };

    applier.apply_creates(&request.create_nodes).await?;
    applier.apply_sparse_edits(&request.sparse_edits).await?;
    applier.apply_reorders(&request.change_orders).await?;
    applier.persist_edits().await?;
    applier.apply_deletes(&request.delete_ids).await?;
    applier.finish().await
}

struct BatchApplier<'a> {
    session: &'a mut dyn StoreSession,
    cancel: &'a CancellationToken,
    actor_id: ActorId,
    token: IdempotencyToken,
    timestamp: HybridTimestamp,
    errors: Vec<ValidationError>,
    pending_edits: Vec<NodeEdit>,
    pending_index: HashMap<NodeId, usize>,
    drafts: Vec<EventDraft>,
    created: HashSet<NodeId>,
    created_ids: Vec<NodeId>,
}

impl BatchApplier<'_> {
    // ── Creates ──────────────────────────────────────────────────

    async fn apply_creates(&mut self, creates: &[PolicyNode]) -> SyncResult<()> {
        if creates.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;

        let mut probe: Vec<NodeId> = creates.iter().map(|node| node.id).collect();
        probe.extend(creates.iter().filter_map(|node| node.parent_id));
        let stored = self.session.existing_ids(&probe).await?;

        // Parents may be satisfied by any create named in the batch, even
        // one later in the array.
        let batch_ids: HashSet<NodeId> = creates.iter().map(|node| node.id).collect();
        let mut to_insert: Vec<PolicyNode> = Vec::new();

        for node in creates {
            if let Some(parent_id) = node.parent_id {
                if !stored.contains(&parent_id) && !batch_ids.contains(&parent_id) {
                    self.errors
                        .push(ValidationError::dangling_parent(node.id, parent_id));
                    continue;
                }
            }
            if stored.contains(&node.id) || self.created.contains(&node.id) {
                // The id already exists: the create degrades to a full
                // overwrite of the stored node.
                self.merge_edit(NodeEdit::new(node.id, NodePatch::full(node)));
            } else {
                self.created.insert(node.id);
                self.created_ids.push(node.id);
                self.draft_field_events(node.id, &NodePatch::full(node))?;
                to_insert.push(node.clone());
            }
        }

        if to_insert.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;
        self.session.insert(&to_insert).await?;
        Ok(())
    }

    // ── Sparse edits ─────────────────────────────────────────────

    async fn apply_sparse_edits(&mut self, edits: &[SparseEdit]) -> SyncResult<()> {
        if edits.iter().all(|edit| edit.ids.is_empty()) {
            return Ok(());
        }
        ensure_live(self.cancel)?;

        let mut probe: Vec<NodeId> = Vec::new();
        for edit in edits {
            probe.extend(edit.ids.iter().copied());
            if let Patch::Set(Some(parent_id)) = edit.patch.parent_id {
                probe.push(parent_id);
            }
        }
        let stored = self.session.existing_ids(&probe).await?;

        for edit in edits {
            let bad_parent = match edit.patch.parent_id {
                Patch::Set(Some(parent_id))
                    if !stored.contains(&parent_id) && !self.created.contains(&parent_id) =>
                {
                    Some(parent_id)
                }
                _ => None,
            };
            for target in edit.expand() {
                if !stored.contains(&target.id) && !self.created.contains(&target.id) {
                    self.errors
                        .push(ValidationError::not_found(target.id, "edit"));
                    continue;
                }
                if let Some(parent_id) = bad_parent {
                    self.errors
                        .push(ValidationError::dangling_parent(target.id, parent_id));
                    continue;
                }
                self.merge_edit(target);
            }
        }
        Ok(())
    }

    // ── Sibling reorders ─────────────────────────────────────────

    async fn apply_reorders(&mut self, orders: &[ChangeOrder]) -> SyncResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;

        let mut probe: Vec<NodeId> = orders.iter().map(|order| order.start_id).collect();
        for order in orders {
            probe.extend(order.insert_ids.iter().copied());
        }
        let mut nodes = self.session.load_nodes(&probe).await?;

        // One sibling group per resolved anchor parent; the root group
        // (parent None) is a group like any other.
        let anchor_ids: HashSet<NodeId> = orders.iter().map(|order| order.start_id).collect();
        let anchor_parents: HashMap<NodeId, Option<NodeId>> = nodes
            .iter()
            .filter(|node| anchor_ids.contains(&node.id))
            .map(|node| (node.id, node.parent_id))
            .collect();

        let mut seen_groups: HashSet<Option<NodeId>> = HashSet::new();
        for order in orders {
            let Some(parent) = anchor_parents.get(&order.start_id) else {
                continue;
            };
            if !seen_groups.insert(*parent) {
                continue;
            }
            ensure_live(self.cancel)?;
            let group = self.session.load_siblings(*parent).await?;
            nodes.extend(group);
        }

        // Entries plan against the snapshot loaded above; edits accumulate
        // without being re-queried, so overlapping entries in one batch are
        // last-write-wins on shared targets.
        let snapshot = ReorderSnapshot::new(NodeSet::from_nodes(nodes), orders);
        for order in orders {
            let plan = snapshot.plan(order);
            self.errors.extend(plan.errors);
            for edit in plan.edits {
                self.merge_edit(edit);
            }
        }
        Ok(())
    }

    // ── Persisting accumulated edits ─────────────────────────────

    async fn persist_edits(&mut self) -> SyncResult<()> {
        if self.pending_edits.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;

        let ids: Vec<NodeId> = self.pending_edits.iter().map(|edit| edit.id).collect();
        let current: HashMap<NodeId, PolicyNode> = self
            .session
            .load_nodes(&ids)
            .await?
            .into_iter()
            .map(|node| (node.id, node))
            .collect();

        let pending = std::mem::take(&mut self.pending_edits);
        self.pending_index.clear();

        let mut updates = Vec::new();
        for edit in pending {
            let Some(node) = current.get(&edit.id) else {
                continue;
            };
            // Only fields whose value actually changes are written and
            // become events.
            let retained = edit.patch.retain_changes(node);
            if retained.is_empty() {
                continue;
            }
            self.draft_field_events(edit.id, &retained)?;
            updates.push(NodeEdit::new(edit.id, retained));
        }

        if updates.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;
        self.session.update(&updates).await?;
        Ok(())
    }

    // ── Deletes ──────────────────────────────────────────────────

    async fn apply_deletes(&mut self, delete_ids: &[NodeId]) -> SyncResult<()> {
        if delete_ids.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;
        let existing = self.session.existing_ids(delete_ids).await?;

        let mut seen = HashSet::new();
        let mut doomed = Vec::new();
        for &id in delete_ids {
            if !seen.insert(id) {
                continue;
            }
            if existing.contains(&id) {
                self.drafts.push(EventDraft::deleted(
                    id,
                    self.actor_id,
                    self.token,
                    self.timestamp,
                ));
                doomed.push(id);
            } else {
                self.errors.push(ValidationError::not_found(id, "delete"));
            }
        }

        if doomed.is_empty() {
            return Ok(());
        }
        ensure_live(self.cancel)?;
        self.session.delete(&doomed).await?;
        Ok(())
    }

    // ── Event append ─────────────────────────────────────────────

    async fn finish(mut self) -> SyncResult<BatchOutcome> {
        let events = if self.drafts.is_empty() {
            Vec::new()
        } else {
            ensure_live(self.cancel)?;
            let drafts = std::mem::take(&mut self.drafts);
            self.session.append_events(self.token, drafts).await?
        };

        Ok(BatchOutcome {
            validation_errors: self.errors,
            created_ids: self.created_ids,
            events,
        })
    }

    // ── Shared plumbing ──────────────────────────────────────────

    /// Accumulates an edit, merging field-by-field into any pending edit of
    /// the same node, last write wins.
    fn merge_edit(&mut self, edit: NodeEdit) {
        match self.pending_index.get(&edit.id) {
            Some(&at) => self.pending_edits[at].patch.merge(edit.patch),
            None => {
                self.pending_index.insert(edit.id, self.pending_edits.len());
                self.pending_edits.push(edit);
            }
        }
    }

    /// Drafts one event per set field of `patch`.
    fn draft_field_events(&mut self, id: NodeId, patch: &NodePatch) -> SyncResult<()> {
        for (field, value) in patch.field_values()? {
            self.drafts.push(EventDraft::field_changed(
                id,
                field,
                value,
                self.actor_id,
                self.token,
                self.timestamp,
            ));
        }
        Ok(())
    }
}
