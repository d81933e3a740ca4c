//! Sparse, field-level edits of policy nodes.
//!
//! A mutation only carries the fields it intends to change. Modeling each
//! field as a [`Patch`] keeps "not specified" distinct from "set to the
//! default": `Keep` leaves the stored value untouched, `Set` overwrites it
//! (including overwriting with an empty string or `None`).

use crate::{NodeId, PolicyNode, node::NodeKind};
use serde::{Deserialize, Serialize};

/// One editable field of a sparse edit: either untouched or set to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch<T> {
    /// Leave the stored value as-is.
    #[default]
    Keep,
    /// Overwrite the stored value.
    Set(T),
}

impl<T> Patch<T> {
    /// Returns true if this patch sets a value.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Returns the set value, if any.
    #[must_use]
    pub const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Keep => None,
        }
    }

    /// Replaces this patch with `newer` unless `newer` is `Keep`.
    pub fn merge(&mut self, newer: Self) {
        if newer.is_set() {
            *self = newer;
        }
    }
}

impl<T: Clone> Patch<T> {
    /// Writes the set value into `slot`; `Keep` leaves it alone.
    pub fn apply_to(&self, slot: &mut T) {
        if let Self::Set(value) = self {
            *slot = value.clone();
        }
    }
}

impl<T: PartialEq> Patch<T> {
    /// Downgrades `Set(v)` to `Keep` when `v` already equals `current`.
    #[must_use]
    pub fn retain_change(self, current: &T) -> Self {
        match self {
            Self::Set(value) if &value == current => Self::Keep,
            other => other,
        }
    }
}

/// A sparse edit of a single [`PolicyNode`]: one [`Patch`] per editable
/// field. The node id is carried separately ([`NodeEdit`], [`SparseEdit`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    pub parent_id: Patch<Option<NodeId>>,
    pub order_index: Patch<i64>,
    pub name: Patch<String>,
    pub login: Patch<String>,
    pub key: Patch<String>,
    pub regex: Patch<String>,
    pub custom_available_characters: Patch<String>,
    pub upper_latin: Patch<bool>,
    pub lower_latin: Patch<bool>,
    pub digits: Patch<bool>,
    pub special_symbols: Patch<bool>,
    pub length: Patch<i64>,
    pub kind: Patch<NodeKind>,
}

impl NodePatch {
    /// An empty patch (every field `Keep`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch setting every field to the node's current values.
    ///
    /// Used when a create targets an id that already exists: the create
    /// degrades to a full overwrite of the stored node.
    #[must_use]
    pub fn full(node: &PolicyNode) -> Self {
        Self {
            parent_id: Patch::Set(node.parent_id),
            order_index: Patch::Set(node.order_index),
            name: Patch::Set(node.name.clone()),
            login: Patch::Set(node.login.clone()),
            key: Patch::Set(node.key.clone()),
            regex: Patch::Set(node.regex.clone()),
            custom_available_characters: Patch::Set(node.custom_available_characters.clone()),
            upper_latin: Patch::Set(node.upper_latin),
            lower_latin: Patch::Set(node.lower_latin),
            digits: Patch::Set(node.digits),
            special_symbols: Patch::Set(node.special_symbols),
            length: Patch::Set(node.length),
            kind: Patch::Set(node.kind),
        }
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.parent_id.is_set()
            || self.order_index.is_set()
            || self.name.is_set()
            || self.login.is_set()
            || self.key.is_set()
            || self.regex.is_set()
            || self.custom_available_characters.is_set()
            || self.upper_latin.is_set()
            || self.lower_latin.is_set()
            || self.digits.is_set()
            || self.special_symbols.is_set()
            || self.length.is_set()
            || self.kind.is_set())
    }

    /// Merges `newer` into this patch, field by field, last write wins.
    ///
    /// Fields `newer` keeps stay as they were; fields `newer` sets replace
    /// whatever this patch had for them.
    pub fn merge(&mut self, newer: Self) {
        self.parent_id.merge(newer.parent_id);
        self.order_index.merge(newer.order_index);
        self.name.merge(newer.name);
        self.login.merge(newer.login);
        self.key.merge(newer.key);
        self.regex.merge(newer.regex);
        self.custom_available_characters
            .merge(newer.custom_available_characters);
        self.upper_latin.merge(newer.upper_latin);
        self.lower_latin.merge(newer.lower_latin);
        self.digits.merge(newer.digits);
        self.special_symbols.merge(newer.special_symbols);
        self.length.merge(newer.length);
        self.kind.merge(newer.kind);
    }

    /// Applies every set field to `node` in place.
    pub fn apply(&self, node: &mut PolicyNode) {
        self.parent_id.apply_to(&mut node.parent_id);
        self.order_index.apply_to(&mut node.order_index);
        self.name.apply_to(&mut node.name);
        self.login.apply_to(&mut node.login);
        self.key.apply_to(&mut node.key);
        self.regex.apply_to(&mut node.regex);
        self.custom_available_characters
            .apply_to(&mut node.custom_available_characters);
        self.upper_latin.apply_to(&mut node.upper_latin);
        self.lower_latin.apply_to(&mut node.lower_latin);
        self.digits.apply_to(&mut node.digits);
        self.special_symbols.apply_to(&mut node.special_symbols);
        self.length.apply_to(&mut node.length);
        self.kind.apply_to(&mut node.kind);
    }

    /// Drops every set field whose value already matches `current`.
    ///
    /// The result patches only real changes, so downstream events describe
    /// what actually changed rather than everything the caller sent.
    #[must_use]
    pub fn retain_changes(self, current: &PolicyNode) -> Self {
        Self {
            parent_id: self.parent_id.retain_change(&current.parent_id),
            order_index: self.order_index.retain_change(&current.order_index),
            name: self.name.retain_change(&current.name),
            login: self.login.retain_change(&current.login),
            key: self.key.retain_change(&current.key),
            regex: self.regex.retain_change(&current.regex),
            custom_available_characters: self
                .custom_available_characters
                .retain_change(&current.custom_available_characters),
            upper_latin: self.upper_latin.retain_change(&current.upper_latin),
            lower_latin: self.lower_latin.retain_change(&current.lower_latin),
            digits: self.digits.retain_change(&current.digits),
            special_symbols: self.special_symbols.retain_change(&current.special_symbols),
            length: self.length.retain_change(&current.length),
            kind: self.kind.retain_change(&current.kind),
        }
    }

    /// JSON-encodes every set field as a `(field, value)` pair for the
    /// event log.
    pub fn field_values(&self) -> crate::Result<Vec<(&'static str, String)>> {
        let mut pairs = Vec::new();

        if let Patch::Set(v) = &self.parent_id {
            pairs.push(("parent_id", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.order_index {
            pairs.push(("order_index", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.name {
            pairs.push(("name", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.login {
            pairs.push(("login", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.key {
            pairs.push(("key", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.regex {
            pairs.push(("regex", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.custom_available_characters {
            pairs.push(("custom_available_characters", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.upper_latin {
            pairs.push(("upper_latin", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.lower_latin {
            pairs.push(("lower_latin", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.digits {
            pairs.push(("digits", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.special_symbols {
            pairs.push(("special_symbols", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.length {
            pairs.push(("length", serde_json::to_string(v)?));
        }
        if let Patch::Set(v) = &self.kind {
            pairs.push(("kind", serde_json::to_string(v)?));
        }

        Ok(pairs)
    }
}

/// A sparse edit as submitted by clients: one patch applied to every node
/// in `ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseEdit {
    pub ids: Vec<NodeId>,
    pub patch: NodePatch,
}

impl SparseEdit {
    /// Creates an edit retargeting one or more nodes.
    #[must_use]
    pub fn new(ids: Vec<NodeId>, patch: NodePatch) -> Self {
        Self { ids, patch }
    }

    /// Expands the multi-target edit into one [`NodeEdit`] per id.
    #[must_use]
    pub fn expand(&self) -> Vec<NodeEdit> {
        self.ids
            .iter()
            .map(|id| NodeEdit::new(*id, self.patch.clone()))
            .collect()
    }
}

/// A pending edit of exactly one node, the unit accumulated by the
/// mutation engine before its single persist round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEdit {
    pub id: NodeId,
    pub patch: NodePatch,
}

impl NodeEdit {
    /// Creates an edit of one node.
    #[must_use]
    pub fn new(id: NodeId, patch: NodePatch) -> Self {
        Self { id, patch }
    }
}
