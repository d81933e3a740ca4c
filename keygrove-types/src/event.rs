//! Field-level sync events.
//!
//! Events are the unit of replication: every applied create, edit, and
//! delete appends one event per affected field to an append-only log, and
//! clients catch up by asking for everything past the highest event id they
//! have seen (their watermark).

use crate::{ActorId, HybridTimestamp, IdempotencyToken, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type stamped on every policy-node event.
pub const ENTITY_TYPE_POLICY_NODE: &str = "policy_node";

/// Field name of the tombstone event a delete appends.
pub const FIELD_DELETED: &str = "deleted";

/// Position of an event in the append-only log.
///
/// Assigned by the event sink in strictly increasing order; clients compare
/// ids to decide what they have already consumed. [`EventId::NONE`] is the
/// "no events wanted" sentinel used as a request watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl Default for EventId {
    /// Defaults to [`EventId::NONE`], matching an empty request watermark.
    fn default() -> Self {
        Self::NONE
    }
}

impl EventId {
    /// Watermark sentinel: the caller wants no events at all (GET), or has
    /// seen nothing yet (POST).
    pub const NONE: Self = Self(-1);

    /// Creates an event id from its raw log position.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw log position.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One appended change: a single field of a single node took a new value
/// (or the node was deleted, flagged by [`FIELD_DELETED`]).
///
/// Events are immutable once appended and totally ordered by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Log position, sink-assigned, strictly increasing.
    pub id: EventId,

    /// The node this event applies to.
    pub entity_id: NodeId,

    /// Entity type tag; always [`ENTITY_TYPE_POLICY_NODE`] here.
    pub entity_type: String,

    /// The changed field's name, or [`FIELD_DELETED`] for a tombstone.
    pub field: String,

    /// JSON encoding of the field's new value (empty for tombstones).
    pub value: String,

    /// The client that produced the change.
    pub actor_id: ActorId,

    /// Token of the mutation batch that produced this event.
    pub token: IdempotencyToken,

    /// When the change was made, per the producing client's hybrid clock.
    pub timestamp: HybridTimestamp,
}

/// An event that has not been appended yet: everything but the log
/// position, which the sink assigns at append time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub entity_id: NodeId,
    pub entity_type: String,
    pub field: String,
    pub value: String,
    pub actor_id: ActorId,
    pub token: IdempotencyToken,
    pub timestamp: HybridTimestamp,
}

impl EventDraft {
    /// Drafts a field-change event for a policy node.
    #[must_use]
    pub fn field_changed(
        entity_id: NodeId,
        field: impl Into<String>,
        value: impl Into<String>,
        actor_id: ActorId,
        token: IdempotencyToken,
        timestamp: HybridTimestamp,
    ) -> Self {
        Self {
            entity_id,
            entity_type: ENTITY_TYPE_POLICY_NODE.to_owned(),
            field: field.into(),
            value: value.into(),
            actor_id,
            token,
            timestamp,
        }
    }

    /// Drafts the tombstone event for a deleted policy node.
    #[must_use]
    pub fn deleted(
        entity_id: NodeId,
        actor_id: ActorId,
        token: IdempotencyToken,
        timestamp: HybridTimestamp,
    ) -> Self {
        Self {
            entity_id,
            entity_type: ENTITY_TYPE_POLICY_NODE.to_owned(),
            field: FIELD_DELETED.to_owned(),
            value: String::new(),
            actor_id,
            token,
            timestamp,
        }
    }

    /// Seals the draft with its sink-assigned log position.
    #[must_use]
    pub fn sequenced(self, id: EventId) -> Event {
        Event {
            id,
            entity_id: self.entity_id,
            entity_type: self.entity_type,
            field: self.field,
            value: self.value,
            actor_id: self.actor_id,
            token: self.token,
            timestamp: self.timestamp,
        }
    }
}
