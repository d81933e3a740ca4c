use keygrove_types::{ActorId, IdempotencyToken, NodeId};
use std::collections::HashSet;
use std::str::FromStr;

// ── NodeId ───────────────────────────────────────────────────────

#[test]
fn node_id_new_is_unique() {
    let a = NodeId::new();
    let b = NodeId::new();
    assert_ne!(a, b);
}

#[test]
fn node_id_is_time_ordered() {
    // v7 ids embed a timestamp, so creation order sorts by the uuid bytes
    let a = NodeId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = NodeId::new();
    assert!(a.as_uuid() < b.as_uuid());
}

#[test]
fn node_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = NodeId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn node_id_display_and_parse() {
    let id = NodeId::new();
    let s = id.to_string();
    let parsed = NodeId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn node_id_from_str() {
    let id = NodeId::new();
    let parsed = NodeId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn node_id_parse_invalid() {
    assert!(NodeId::parse("not-a-uuid").is_err());
}

#[test]
fn node_id_hash_and_eq() {
    let id = NodeId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id); // duplicate
    assert_eq!(set.len(), 1);
}

#[test]
fn node_id_serialization_is_transparent() {
    let id = NodeId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let parsed: NodeId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

// ── ActorId ──────────────────────────────────────────────────────

#[test]
fn actor_id_new_is_unique() {
    let a = ActorId::new();
    let b = ActorId::new();
    assert_ne!(a, b);
}

#[test]
fn actor_id_display_and_parse() {
    let id = ActorId::new();
    let parsed = ActorId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn actor_id_from_str_invalid() {
    assert!(ActorId::from_str("garbage").is_err());
}

#[test]
fn actor_id_serialization_roundtrip() {
    let id = ActorId::new();
    let json = serde_json::to_string(&id).unwrap();
    let parsed: ActorId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

// ── IdempotencyToken ─────────────────────────────────────────────

#[test]
fn token_new_is_unique() {
    let a = IdempotencyToken::new();
    let b = IdempotencyToken::new();
    assert_ne!(a, b);
}

#[test]
fn token_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::new_v4();
    let token = IdempotencyToken::from_uuid(uuid);
    assert_eq!(token.as_uuid(), uuid);
}

#[test]
fn token_display_and_parse() {
    let token = IdempotencyToken::new();
    let parsed = IdempotencyToken::parse(&token.to_string()).unwrap();
    assert_eq!(token, parsed);
}

#[test]
fn token_hash_and_eq() {
    let token = IdempotencyToken::new();
    let mut set = HashSet::new();
    set.insert(token);
    set.insert(token);
    assert_eq!(set.len(), 1);
}
