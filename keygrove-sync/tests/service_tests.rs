use keygrove_store::SqliteStore;
use keygrove_sync::{GetRequest, GetResponse, PolicyService, PostRequest};
use keygrove_types::{
    ActorId, ENTITY_TYPE_POLICY_NODE, Event, EventId, HybridTimestamp, IdempotencyToken, NodeId,
    PolicyNode,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn make_service() -> PolicyService<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    PolicyService::new(store, ActorId::new())
}

fn make_node(parent: Option<NodeId>, order_index: i64, name: &str) -> PolicyNode {
    let mut node = PolicyNode::new(NodeId::new());
    node.parent_id = parent;
    node.order_index = order_index;
    node.name = name.to_owned();
    node
}

fn live() -> CancellationToken {
    CancellationToken::new()
}

async fn seed(service: &PolicyService<SqliteStore>, nodes: Vec<PolicyNode>) {
    let request = PostRequest {
        create_nodes: nodes,
        ..PostRequest::default()
    };
    let response = service.post(&request, &live()).await.unwrap();
    assert!(response.validation_errors.is_empty());
}

fn ids(nodes: &[PolicyNode]) -> Vec<NodeId> {
    nodes.iter().map(|node| node.id).collect()
}

// ── Reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn roots_come_back_in_sibling_order() {
    let service = make_service();
    let last = make_node(None, 2, "last");
    let first = make_node(None, 0, "first");
    let middle = make_node(None, 1, "middle");
    seed(&service, vec![last.clone(), first.clone(), middle.clone()]).await;

    let request = GetRequest {
        get_roots: true,
        ..GetRequest::default()
    };
    let response = service.get(&request, &live()).await.unwrap();

    assert_eq!(
        ids(&response.roots.unwrap()),
        vec![first.id, middle.id, last.id]
    );
}

#[tokio::test]
async fn roots_stay_unset_unless_requested() {
    let service = make_service();
    seed(&service, vec![make_node(None, 0, "root")]).await;

    let response = service.get(&GetRequest::default(), &live()).await.unwrap();

    assert!(response.roots.is_none());
    assert!(response.children.is_empty());
    assert!(response.parents.is_empty());
    assert!(response.validation_errors.is_empty());
}

#[tokio::test]
async fn children_map_carries_one_entry_per_requested_id() {
    let service = make_service();
    let root = make_node(None, 0, "root");
    let child = make_node(Some(root.id), 0, "child");
    seed(&service, vec![root.clone(), child.clone()]).await;

    let absent = NodeId::new();
    let request = GetRequest {
        get_children_ids: vec![root.id, child.id, absent],
        ..GetRequest::default()
    };
    let response = service.get(&request, &live()).await.unwrap();

    assert_eq!(response.children.len(), 3);
    assert_eq!(ids(&response.children[&root.id]), vec![child.id]);
    assert!(response.children[&child.id].is_empty());
    // an unknown id is an empty group, not an error
    assert!(response.children[&absent].is_empty());
    assert!(response.validation_errors.is_empty());
}

#[tokio::test]
async fn parents_chain_runs_root_to_leaf() {
    let service = make_service();
    let root = make_node(None, 0, "root");
    let mid = make_node(Some(root.id), 0, "mid");
    let leaf = make_node(Some(mid.id), 0, "leaf");
    seed(&service, vec![root.clone(), mid.clone(), leaf.clone()]).await;

    let request = GetRequest {
        get_parents_ids: vec![leaf.id],
        ..GetRequest::default()
    };
    let response = service.get(&request, &live()).await.unwrap();

    assert_eq!(
        ids(&response.parents[&leaf.id]),
        vec![root.id, mid.id, leaf.id]
    );
}

#[tokio::test]
async fn parents_for_an_unknown_id_reports_not_found() {
    let service = make_service();
    seed(&service, vec![make_node(None, 0, "root")]).await;

    let missing = NodeId::new();
    let request = GetRequest {
        get_parents_ids: vec![missing],
        ..GetRequest::default()
    };
    let response = service.get(&request, &live()).await.unwrap();

    assert!(response.parents.is_empty());
    assert_eq!(response.validation_errors.len(), 1);
}

#[tokio::test]
async fn one_request_can_combine_roots_children_and_parents() {
    let service = make_service();
    let root = make_node(None, 0, "root");
    let child = make_node(Some(root.id), 0, "child");
    seed(&service, vec![root.clone(), child.clone()]).await;

    let request = GetRequest {
        get_roots: true,
        get_children_ids: vec![root.id],
        get_parents_ids: vec![child.id],
        ..GetRequest::default()
    };
    let response = service.get(&request, &live()).await.unwrap();

    assert_eq!(ids(&response.roots.unwrap()), vec![root.id]);
    assert_eq!(ids(&response.children[&root.id]), vec![child.id]);
    assert_eq!(ids(&response.parents[&child.id]), vec![root.id, child.id]);
    assert!(response.validation_errors.is_empty());
}

// ── Event watermarks ─────────────────────────────────────────────

#[tokio::test]
async fn get_skips_events_without_a_watermark() {
    let service = make_service();
    seed(&service, vec![make_node(None, 0, "root")]).await;

    let response = service.get(&GetRequest::default(), &live()).await.unwrap();
    assert!(response.events.is_empty());
}

#[tokio::test]
async fn get_returns_everything_past_the_watermark() {
    let service = make_service();
    seed(&service, vec![make_node(None, 0, "root")]).await;

    let all = service
        .get(
            &GetRequest {
                last_event_id: EventId::from_raw(0),
                ..GetRequest::default()
            },
            &live(),
        )
        .await
        .unwrap();
    assert_eq!(all.events.len(), 13);

    let mid = all.events[6].id;
    let suffix = service
        .get(
            &GetRequest {
                last_event_id: mid,
                ..GetRequest::default()
            },
            &live(),
        )
        .await
        .unwrap();
    assert_eq!(suffix.events.len(), 6);
    assert!(suffix.events.iter().all(|event| event.id > mid));
}

// ── Ingest ───────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_inserts_new_nodes_and_overwrites_known_ones() {
    let service = make_service();
    let local = make_node(None, 0, "local name");
    seed(&service, vec![local.clone()]).await;

    let mut remote = local.clone();
    remote.name = "remote name".to_owned();
    let extra_root = make_node(None, 1, "remote root");
    let extra_child = make_node(Some(local.id), 0, "remote child");
    let snapshot = GetResponse {
        roots: Some(vec![remote, extra_root.clone()]),
        children: [(local.id, vec![extra_child.clone()])].into(),
        ..GetResponse::default()
    };

    service.ingest(&snapshot, &live()).await.unwrap();

    let response = service
        .get(
            &GetRequest {
                get_roots: true,
                get_children_ids: vec![local.id],
                ..GetRequest::default()
            },
            &live(),
        )
        .await
        .unwrap();
    let roots = response.roots.unwrap();
    assert_eq!(ids(&roots), vec![local.id, extra_root.id]);
    assert_eq!(roots[0].name, "remote name");
    assert_eq!(ids(&response.children[&local.id]), vec![extra_child.id]);
}

#[tokio::test]
async fn ingest_appends_nothing_to_the_event_log() {
    let service = make_service();
    seed(&service, vec![make_node(None, 0, "root")]).await;

    let snapshot = GetResponse {
        roots: Some(vec![make_node(None, 1, "remote")]),
        ..GetResponse::default()
    };
    service.ingest(&snapshot, &live()).await.unwrap();

    let log = service
        .get(
            &GetRequest {
                last_event_id: EventId::from_raw(0),
                ..GetRequest::default()
            },
            &live(),
        )
        .await
        .unwrap();
    // still just the 13 creation events from the local seed
    assert_eq!(log.events.len(), 13);
}

#[tokio::test]
async fn ingest_of_an_empty_snapshot_is_a_noop() {
    let service = make_service();
    service
        .ingest(&GetResponse::default(), &live())
        .await
        .unwrap();
}

#[tokio::test]
async fn ingest_advances_the_clock_past_peer_events() {
    let service = make_service();
    let far_ahead = HybridTimestamp::new(HybridTimestamp::now().wall_time() + 1_000_000_000, 9);
    let peer_event = Event {
        id: EventId::from_raw(1),
        entity_id: NodeId::new(),
        entity_type: ENTITY_TYPE_POLICY_NODE.to_owned(),
        field: "name".to_owned(),
        value: "\"remote\"".to_owned(),
        actor_id: ActorId::new(),
        token: IdempotencyToken::new(),
        timestamp: far_ahead,
    };
    let snapshot = GetResponse {
        events: vec![peer_event],
        ..GetResponse::default()
    };
    service.ingest(&snapshot, &live()).await.unwrap();

    let response = service
        .post(
            &PostRequest {
                create_nodes: vec![make_node(None, 0, "local")],
                ..PostRequest::default()
            },
            &live(),
        )
        .await
        .unwrap();

    // local events must sort after everything already seen from the peer
    assert!(response.events.iter().all(|event| event.timestamp > far_ahead));
}
