//! SQLite-backed persistence for the credential-policy tree.
//!
//! This crate owns two tables: the `policy_node` entity table and the
//! `sync_event` append-only log. Access goes through the [`NodeStore`]
//! trait, which hands out request-scoped [`StoreSession`]s; a session holds
//! the store exclusively, wraps its work in one transaction, and rolls back
//! if dropped uncommitted.

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use store::{NodeStore, StoreSession};
