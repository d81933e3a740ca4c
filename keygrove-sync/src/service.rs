//! The public sync entry points: snapshot reads, mutation batches, local
//! replay, and peer ingest.

use crate::coordinator::{self, ensure_live};
use crate::error::SyncResult;
use crate::protocol::{GetRequest, GetResponse, PostRequest, PostResponse};
use keygrove_store::NodeStore;
use keygrove_tree::NodeSet;
use keygrove_types::{
    ActorId, EventId, HybridTimestamp, IdempotencyToken, NodeEdit, NodeId, NodePatch, PolicyNode,
    ValidationError,
};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Facade over one local store: answers reads, applies mutation batches,
/// and ingests peer snapshots.
///
/// Every request runs on its own store session, so requests never
/// interleave mid-transaction; the hybrid clock stamps each batch's events
/// and is advanced past any peer timestamps seen during ingest.
pub struct PolicyService<S: NodeStore> {
    store: S,
    actor_id: ActorId,
    clock: Mutex<HybridTimestamp>,
}

impl<S: NodeStore> PolicyService<S> {
    /// Creates a service for the given store, stamping events as `actor_id`.
    #[must_use]
    pub fn new(store: S, actor_id: ActorId) -> Self {
        Self {
            store,
            actor_id,
            clock: Mutex::new(HybridTimestamp::now()),
        }
    }

    /// The actor id stamped onto events this service produces.
    #[must_use]
    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    /// Answers a read request from one consistent store snapshot.
    pub async fn get(
        &self,
        request: &GetRequest,
        cancel: &CancellationToken,
    ) -> SyncResult<GetResponse> {
        debug!(
            "get: roots={} children={} parents={} since={}",
            request.get_roots,
            request.get_children_ids.len(),
            request.get_parents_ids.len(),
            request.last_event_id
        );
        ensure_live(cancel)?;
        let mut session = self.store.session().await?;

        let mut loaded: Vec<PolicyNode> = Vec::new();
        if request.get_roots {
            loaded.extend(session.load_roots().await?);
        }
        if !request.get_children_ids.is_empty() {
            ensure_live(cancel)?;
            loaded.extend(session.load_children(&request.get_children_ids).await?);
        }
        if !request.get_parents_ids.is_empty() {
            ensure_live(cancel)?;
            loaded.extend(
                session
                    .load_ancestor_closure(&request.get_parents_ids)
                    .await?,
            );
        }
        let set = NodeSet::from_nodes(loaded);

        let mut response = GetResponse::default();
        if request.get_roots {
            response.roots = Some(set.roots());
        }
        for id in &request.get_children_ids {
            response.children.insert(*id, set.children_of(*id));
        }
        for id in &request.get_parents_ids {
            if set.contains(*id) {
                response.parents.insert(*id, set.ancestors_of(*id)?);
            } else {
                response
                    .validation_errors
                    .push(ValidationError::not_found(*id, "parents"));
            }
        }

        if request.last_event_id != EventId::NONE {
            ensure_live(cancel)?;
            response.events = session.events_after(request.last_event_id).await?;
        }

        if !response.validation_errors.is_empty() {
            warn!(
                "get completed with {} validation errors",
                response.validation_errors.len()
            );
        }
        Ok(response)
    }

    /// Applies one mutation batch in one transaction.
    ///
    /// Validation failures skip their entry and are returned in the
    /// response; the remainder of the batch still commits. Store failures
    /// and cancellation roll everything back.
    pub async fn post(
        &self,
        request: &PostRequest,
        cancel: &CancellationToken,
    ) -> SyncResult<PostResponse> {
        debug!(
            "post {}: {} creates, {} edits, {} reorders, {} deletes",
            request.token,
            request.create_nodes.len(),
            request.sparse_edits.len(),
            request.change_orders.len(),
            request.delete_ids.len()
        );
        ensure_live(cancel)?;
        let timestamp = self.tick();

        let mut session = self.store.session().await?;
        session.begin().await?;

        let outcome =
            coordinator::apply_batch(session.as_mut(), request, self.actor_id, timestamp, cancel)
                .await?;

        ensure_live(cancel)?;
        let events = session.events_after(request.last_event_id).await?;
        session.commit().await?;

        if !outcome.validation_errors.is_empty() {
            warn!(
                "batch {} committed with {} validation errors",
                request.token,
                outcome.validation_errors.len()
            );
        }
        info!(
            "batch {} committed: {} events appended, {} nodes created",
            request.token,
            outcome.events.len(),
            outcome.created_ids.len()
        );

        Ok(PostResponse {
            validation_errors: outcome.validation_errors,
            created_ids: outcome.created_ids,
            events,
        })
    }

    /// Replays a previously constructed batch under a fresh token.
    ///
    /// This is the path for applying a queued offline batch to the local
    /// store: the original token stays reserved for the batch's first
    /// submission, the fresh one makes the local apply its own batch.
    pub async fn apply_local(
        &self,
        request: &PostRequest,
        cancel: &CancellationToken,
    ) -> SyncResult<PostResponse> {
        let mut replay = request.clone();
        replay.token = IdempotencyToken::new();
        self.post(&replay, cancel).await
    }

    /// Ingests the nodes carried by a peer's snapshot response.
    ///
    /// Every node in `snapshot` is upserted as-is: present ids are
    /// overwritten, new ids inserted. No events are emitted; this is the
    /// replication half of sync, not a local mutation. The local clock is
    /// advanced past every peer event timestamp so subsequent local events
    /// sort after what the peer has seen.
    pub async fn ingest(
        &self,
        snapshot: &GetResponse,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        for event in &snapshot.events {
            self.observe(event.timestamp);
        }

        let mut carried: Vec<PolicyNode> = Vec::new();
        if let Some(roots) = &snapshot.roots {
            carried.extend(roots.iter().cloned());
        }
        for group in snapshot.children.values() {
            carried.extend(group.iter().cloned());
        }
        for chain in snapshot.parents.values() {
            carried.extend(chain.iter().cloned());
        }
        let nodes = NodeSet::from_nodes(carried);
        if nodes.is_empty() {
            return Ok(());
        }

        ensure_live(cancel)?;
        let mut session = self.store.session().await?;
        session.begin().await?;

        let ids: Vec<NodeId> = nodes.iter().map(|node| node.id).collect();
        let existing = session.existing_ids(&ids).await?;

        let mut to_insert: Vec<PolicyNode> = Vec::new();
        let mut to_update: Vec<NodeEdit> = Vec::new();
        for node in nodes.iter() {
            if existing.contains(&node.id) {
                to_update.push(NodeEdit::new(node.id, NodePatch::full(node)));
            } else {
                to_insert.push(node.clone());
            }
        }

        ensure_live(cancel)?;
        session.insert(&to_insert).await?;
        ensure_live(cancel)?;
        session.update(&to_update).await?;
        session.commit().await?;

        info!(
            "ingested {} nodes ({} new) from peer snapshot",
            nodes.len(),
            to_insert.len()
        );
        Ok(())
    }

    /// Advances the clock for a new local batch and returns its timestamp.
    fn tick(&self) -> HybridTimestamp {
        let mut clock = self.clock.lock().unwrap();
        *clock = clock.tick();
        *clock
    }

    /// Folds a remote timestamp into the clock.
    fn observe(&self, remote: HybridTimestamp) {
        let mut clock = self.clock.lock().unwrap();
        *clock = clock.receive(&remote);
    }
}
