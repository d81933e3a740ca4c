//! Request and response shapes for the sync facade.
//!
//! Transport encoding is out of scope: these are plain serde types an
//! embedding application moves over whatever channel it already has. All
//! request fields are optional on the wire; omitted fields fall back to
//! their defaults, so a client can send only what it needs.

use keygrove_types::{
    ChangeOrder, Event, EventId, IdempotencyToken, NodeId, PolicyNode, SparseEdit, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a client wants to read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetRequest {
    /// Return every root node, ordered by `order_index`.
    pub get_roots: bool,

    /// Return the ordered children of each of these nodes.
    pub get_children_ids: Vec<NodeId>,

    /// Return the root-to-leaf ancestor chain of each of these nodes.
    pub get_parents_ids: Vec<NodeId>,

    /// Highest event id the caller has already seen. [`EventId::NONE`]
    /// (the default) asks for no events at all.
    pub last_event_id: EventId,
}

/// The answer to a [`GetRequest`].
///
/// `children` and `parents` are keyed by the requested ids; a requested id
/// with nothing under it maps to an empty list. Requested ancestor chains
/// whose node does not exist are reported in `validation_errors` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResponse {
    /// Every loaded root, present only when roots were requested.
    pub roots: Option<Vec<PolicyNode>>,

    /// Ordered children per requested parent id.
    pub children: HashMap<NodeId, Vec<PolicyNode>>,

    /// Root-to-leaf ancestor chain (inclusive) per requested id.
    pub parents: HashMap<NodeId, Vec<PolicyNode>>,

    /// Events newer than the request watermark, in log order.
    pub events: Vec<Event>,

    /// Requested entries that could not be resolved.
    pub validation_errors: Vec<ValidationError>,
}

/// One mutation batch.
///
/// Applied atomically in a fixed order: creates, then sparse edits, then
/// sibling reorders, then deletes. Entries that fail validation are
/// skipped and reported; the rest of the batch still commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRequest {
    /// Highest event id the caller has already seen; the response carries
    /// everything newer. [`EventId::NONE`] returns the full log.
    pub last_event_id: EventId,

    /// Nodes to delete.
    pub delete_ids: Vec<NodeId>,

    /// Nodes to create. Creating an id that already exists overwrites the
    /// stored node in place.
    pub create_nodes: Vec<PolicyNode>,

    /// Field-level edits, each applied to every node it targets.
    pub sparse_edits: Vec<SparseEdit>,

    /// Sibling moves, processed in array order.
    pub change_orders: Vec<ChangeOrder>,

    /// Batch identity for replay detection. Defaults to a fresh random
    /// token; reusing a token marks the batch as a replay of the original.
    pub token: IdempotencyToken,
}

/// The answer to a [`PostRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostResponse {
    /// Entries that were skipped, in the order they were discovered.
    pub validation_errors: Vec<ValidationError>,

    /// Ids of the nodes this batch created (overwrites of existing ids are
    /// not listed).
    pub created_ids: Vec<NodeId>,

    /// Events newer than the request watermark, including those this batch
    /// appended, in log order.
    pub events: Vec<Event>,
}
