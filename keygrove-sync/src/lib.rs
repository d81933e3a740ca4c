//! Synchronization facade for the Keygrove policy tree.
//!
//! This crate ties the pure hierarchy algorithms to a node store:
//! - [`PolicyService`] answers snapshot reads (roots, children, ancestor
//!   chains) and event catch-up in one consistent session per request
//! - the [`coordinator`] applies mutation batches (create, edit, reorder,
//!   delete) atomically, collecting validation errors instead of failing
//! - peer snapshots are ingested as upserts, with the local hybrid clock
//!   advanced past everything the peer has seen
//!
//! Transport is out of scope; embedders move the [`protocol`] types over
//! whatever channel they have.

pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod service;

pub use coordinator::BatchOutcome;
pub use error::{SyncError, SyncResult};
pub use protocol::{GetRequest, GetResponse, PostRequest, PostResponse};
pub use service::PolicyService;
