//! Hierarchy resolution over a flat set of loaded nodes.
//!
//! The resolver never queries storage. A [`NodeSet`] is built from whatever
//! the caller loaded (typically a union of roots, child groups, and an
//! ancestor closure) and answers root/children/ancestor questions from that
//! snapshot alone.

use crate::{TreeError, TreeResult};
use keygrove_types::{NodeId, PolicyNode};
use std::collections::{HashMap, HashSet};

/// An id-keyed view over a flat load of policy nodes.
///
/// Preserves load order for iteration, so upstream `ORDER BY order_index`
/// survives into child and root listings. Duplicate ids (possible when the
/// branches of a union query overlap) keep the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashMap<NodeId, PolicyNode>,
    load_order: Vec<NodeId>,
}

impl NodeSet {
    /// Builds a set from loaded nodes, deduplicating by id.
    #[must_use]
    pub fn from_nodes(nodes: Vec<PolicyNode>) -> Self {
        let mut set = Self {
            nodes: HashMap::with_capacity(nodes.len()),
            load_order: Vec::with_capacity(nodes.len()),
        };

        for node in nodes {
            set.insert(node);
        }

        set
    }

    /// Adds a node unless its id is already present.
    pub fn insert(&mut self, node: PolicyNode) {
        if !self.nodes.contains_key(&node.id) {
            self.load_order.push(node.id);
            self.nodes.insert(node.id, node);
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&PolicyNode> {
        self.nodes.get(&id)
    }

    /// Returns true if the id is loaded.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of distinct nodes loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes in load order.
    pub fn iter(&self) -> impl Iterator<Item = &PolicyNode> {
        self.load_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All loaded nodes without a parent, in load order.
    #[must_use]
    pub fn roots(&self) -> Vec<PolicyNode> {
        self.iter()
            .filter(|node| node.parent_id.is_none())
            .cloned()
            .collect()
    }

    /// All loaded nodes whose parent is `parent`, in load order.
    #[must_use]
    pub fn children_of(&self, parent: NodeId) -> Vec<PolicyNode> {
        self.iter()
            .filter(|node| node.parent_id == Some(parent))
            .cloned()
            .collect()
    }

    /// The chain from the tree root down to `id` inclusive, root first.
    ///
    /// Walks parent links from `id` upward, recording each node, then
    /// reverses the chain because consumers read paths top-down. The walk
    /// is iterative with a visited guard, so depth costs no stack and a
    /// corrupt parent cycle fails instead of looping.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingNode`] if the walk reaches an id that was never
    /// loaded; [`TreeError::CycleDetected`] if it revisits one.
    pub fn ancestors_of(&self, id: NodeId) -> TreeResult<Vec<PolicyNode>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id;

        loop {
            if !visited.insert(current) {
                return Err(TreeError::CycleDetected { id: current });
            }

            let node = self
                .get(current)
                .ok_or(TreeError::MissingNode { id: current })?;
            chain.push(node.clone());

            match node.parent_id {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }
}

impl FromIterator<PolicyNode> for NodeSet {
    fn from_iter<I: IntoIterator<Item = PolicyNode>>(iter: I) -> Self {
        Self::from_nodes(iter.into_iter().collect())
    }
}
