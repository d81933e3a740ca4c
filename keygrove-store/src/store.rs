//! Storage abstraction traits.
//!
//! Defines the seam between the sync layer and the backing database so the
//! mutation engine stays storage-agnostic and tests can substitute stores.

use crate::error::StoreResult;
use async_trait::async_trait;
use keygrove_types::{Event, EventDraft, EventId, IdempotencyToken, NodeEdit, NodeId, PolicyNode};
use std::collections::HashSet;

/// Abstract node store interface.
///
/// A store hands out [`StoreSession`]s; all reads and writes go through a
/// session so every request observes one consistent snapshot.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Opens a session against the store.
    ///
    /// Sessions are exclusive: while one is alive, further `session` calls
    /// wait for it to be dropped.
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>>;
}

/// One request-scoped handle on the store.
///
/// Between [`begin`](Self::begin) and [`commit`](Self::commit) all writes
/// are transactional; dropping a session with an open transaction rolls it
/// back.
#[async_trait]
pub trait StoreSession: Send {
    /// Starts a transaction.
    async fn begin(&mut self) -> StoreResult<()>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Loads the nodes with the given ids. Missing ids are skipped.
    async fn load_nodes(&mut self, ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>>;

    /// Loads every root node (no parent), ordered by `order_index`.
    async fn load_roots(&mut self) -> StoreResult<Vec<PolicyNode>>;

    /// Loads the children of the given parents, ordered by `order_index`.
    async fn load_children(&mut self, parent_ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>>;

    /// Loads one sibling group, ordered by `order_index`.
    ///
    /// `None` loads the root group (nodes without a parent).
    async fn load_siblings(&mut self, parent: Option<NodeId>) -> StoreResult<Vec<PolicyNode>>;

    /// Loads the given nodes plus every transitive ancestor, up to and
    /// including the roots of their trees.
    ///
    /// The walk follows parent links upward inside the database and
    /// terminates even if the stored graph contains a parent cycle.
    async fn load_ancestor_closure(&mut self, ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>>;

    /// Returns the subset of `ids` that exist in the store.
    async fn existing_ids(&mut self, ids: &[NodeId]) -> StoreResult<HashSet<NodeId>>;

    /// Inserts new nodes. Inserting an existing id is an error.
    async fn insert(&mut self, nodes: &[PolicyNode]) -> StoreResult<()>;

    /// Applies field-level edits. Edits with empty patches and edits
    /// targeting absent ids are no-ops.
    async fn update(&mut self, edits: &[NodeEdit]) -> StoreResult<()>;

    /// Deletes the nodes with the given ids. Missing ids are skipped.
    async fn delete(&mut self, ids: &[NodeId]) -> StoreResult<()>;

    /// Appends a batch of events to the log, assigning ascending ids.
    ///
    /// Deduplicates whole batches: if any event with `token` was appended
    /// before, the batch is dropped and the result is empty.
    async fn append_events(
        &mut self,
        token: IdempotencyToken,
        drafts: Vec<EventDraft>,
    ) -> StoreResult<Vec<Event>>;

    /// Returns every event with an id greater than `watermark`, in log
    /// order. [`EventId::NONE`] returns the whole log.
    async fn events_after(&mut self, watermark: EventId) -> StoreResult<Vec<Event>>;
}
