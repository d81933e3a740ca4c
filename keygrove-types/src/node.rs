//! The persisted policy-node entity.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Discriminator distinguishing node kinds (e.g. a leaf generation rule
/// from a grouping folder).
///
/// The core persists and returns it unchanged and never branches on it;
/// interpretation belongs to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKind(i64);

impl NodeKind {
    /// A leaf credential-generation rule.
    pub const POLICY: Self = Self(0);
    /// A grouping folder.
    pub const FOLDER: Self = Self(1);

    /// Creates a kind from its raw discriminator value.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw discriminator value.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

/// A node in the credential-policy tree.
///
/// Nodes form a forest: `parent_id = None` marks a root, and siblings under
/// one parent are ordered by `order_index`. Order indices are
/// unique-in-intent per parent but not enforced by storage; gaps and
/// duplicates can exist transiently between mutation steps and are resolved
/// by reordering, never assumed absent.
///
/// Text fields are bounded (255 units, 1000 for the custom palette);
/// the storage layer enforces the bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyNode {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub order_index: i64,
    pub name: String,
    pub login: String,
    pub key: String,
    pub regex: String,
    pub custom_available_characters: String,
    pub upper_latin: bool,
    pub lower_latin: bool,
    pub digits: bool,
    pub special_symbols: bool,
    pub length: i64,
    pub kind: NodeKind,
}

impl PolicyNode {
    /// Creates an empty node with the given id, parented at the root level.
    ///
    /// All policy fields start at their defaults; callers fill in what they
    /// need before persisting.
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent_id: None,
            order_index: 0,
            name: String::new(),
            login: String::new(),
            key: String::new(),
            regex: String::new(),
            custom_available_characters: String::new(),
            upper_latin: false,
            lower_latin: false,
            digits: false,
            special_symbols: false,
            length: 0,
            kind: NodeKind::POLICY,
        }
    }
}
