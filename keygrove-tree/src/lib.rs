//! Pure tree algorithms for Keygrove.
//!
//! This crate implements the two stateless pieces of the policy-tree core:
//!
//! - [`NodeSet`]: hierarchy resolution, answering root sets, ordered child
//!   sets, and ancestor chains over a flat set of loaded nodes
//! - [`ReorderSnapshot`]: sibling reordering, converting a [`ChangeOrder`]
//!   into the minimal set of `order_index` / `parent_id` edits
//!
//! Nothing here touches storage. Callers load a sufficient closure of nodes
//! up front (the store's ancestor-closure and sibling-group queries exist
//! for exactly that) and hand it to these types; an id that turns out to be
//! missing from the loaded set is a caller bug and surfaces as a fatal
//! [`TreeError`], not a validation error.
//!
//! [`ChangeOrder`]: keygrove_types::ChangeOrder

mod error;
mod reorder;
mod resolver;

pub use error::{TreeError, TreeResult};
pub use reorder::{ReorderPlan, ReorderSnapshot};
pub use resolver::NodeSet;
