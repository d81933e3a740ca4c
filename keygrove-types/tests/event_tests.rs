use keygrove_types::{
    ActorId, ENTITY_TYPE_POLICY_NODE, EventDraft, EventId, FIELD_DELETED, HybridTimestamp,
    IdempotencyToken, NodeId,
};

fn make_draft(field: &str) -> EventDraft {
    EventDraft::field_changed(
        NodeId::new(),
        field,
        "\"value\"",
        ActorId::new(),
        IdempotencyToken::new(),
        HybridTimestamp::new(100, 0),
    )
}

// ── EventId ──────────────────────────────────────────────────────

#[test]
fn event_id_orders_by_raw_value() {
    let a = EventId::from_raw(1);
    let b = EventId::from_raw(2);
    assert!(a < b);
    assert_eq!(a.as_i64(), 1);
}

#[test]
fn none_sentinel_is_below_every_assigned_id() {
    assert_eq!(EventId::NONE.as_i64(), -1);
    assert!(EventId::NONE < EventId::from_raw(0));
}

#[test]
fn default_event_id_is_the_none_sentinel() {
    assert_eq!(EventId::default(), EventId::NONE);
}

#[test]
fn event_id_serializes_transparently() {
    let id = EventId::from_raw(42);
    assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    let parsed: EventId = serde_json::from_str("42").unwrap();
    assert_eq!(parsed, id);
}

// ── Drafting ─────────────────────────────────────────────────────

#[test]
fn field_changed_carries_policy_node_type() {
    let draft = make_draft("name");
    assert_eq!(draft.entity_type, ENTITY_TYPE_POLICY_NODE);
    assert_eq!(draft.field, "name");
    assert_eq!(draft.value, "\"value\"");
}

#[test]
fn deleted_draft_is_a_tombstone() {
    let id = NodeId::new();
    let draft = EventDraft::deleted(
        id,
        ActorId::new(),
        IdempotencyToken::new(),
        HybridTimestamp::new(5, 0),
    );
    assert_eq!(draft.entity_id, id);
    assert_eq!(draft.field, FIELD_DELETED);
    assert_eq!(draft.value, "");
}

#[test]
fn sequencing_preserves_draft_contents() {
    let draft = make_draft("login");
    let event = draft.clone().sequenced(EventId::from_raw(9));

    assert_eq!(event.id, EventId::from_raw(9));
    assert_eq!(event.entity_id, draft.entity_id);
    assert_eq!(event.entity_type, draft.entity_type);
    assert_eq!(event.field, draft.field);
    assert_eq!(event.value, draft.value);
    assert_eq!(event.actor_id, draft.actor_id);
    assert_eq!(event.token, draft.token);
    assert_eq!(event.timestamp, draft.timestamp);
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn event_serde_roundtrip() {
    let event = make_draft("regex").sequenced(EventId::from_raw(3));
    let json = serde_json::to_string(&event).unwrap();
    let parsed: keygrove_types::Event = serde_json::from_str(&json).unwrap();
    assert_eq!(event, parsed);
}
