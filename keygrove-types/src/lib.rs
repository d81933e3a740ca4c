//! Core type definitions for Keygrove.
//!
//! This crate defines the fundamental, storage-agnostic types used throughout
//! the policy-tree engine:
//! - Node, actor, and batch identifiers (UUID-backed)
//! - The `PolicyNode` entity and its sparse-edit patches
//! - Field-level sync events and their sequencing
//! - Hybrid Logical Clock timestamps
//! - Validation errors reported alongside normal responses
//!
//! Algorithms (hierarchy resolution, reordering) and storage live in their
//! own crates; nothing here performs I/O.

mod change_order;
mod event;
mod ids;
mod node;
mod patch;
mod timestamp;
mod validation;

pub use change_order::ChangeOrder;
pub use event::{ENTITY_TYPE_POLICY_NODE, Event, EventDraft, EventId, FIELD_DELETED};
pub use ids::{ActorId, IdempotencyToken, NodeId};
pub use node::{NodeKind, PolicyNode};
pub use patch::{NodeEdit, NodePatch, Patch, SparseEdit};
pub use timestamp::HybridTimestamp;
pub use validation::ValidationError;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
