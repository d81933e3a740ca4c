use keygrove_types::{NodeEdit, NodeId, NodeKind, NodePatch, Patch, PolicyNode, SparseEdit};

fn make_node(name: &str) -> PolicyNode {
    let mut node = PolicyNode::new(NodeId::new());
    node.name = name.to_owned();
    node.login = "alice".to_owned();
    node.length = 16;
    node.upper_latin = true;
    node
}

// ── Patch ────────────────────────────────────────────────────────

#[test]
fn keep_is_default() {
    let patch: Patch<i64> = Patch::default();
    assert!(!patch.is_set());
    assert_eq!(patch.as_set(), None);
}

#[test]
fn set_exposes_value() {
    let patch = Patch::Set(7);
    assert!(patch.is_set());
    assert_eq!(patch.as_set(), Some(&7));
}

#[test]
fn merge_prefers_newer_set() {
    let mut patch = Patch::Set(1);
    patch.merge(Patch::Set(2));
    assert_eq!(patch, Patch::Set(2));
}

#[test]
fn merge_ignores_newer_keep() {
    let mut patch = Patch::Set(1);
    patch.merge(Patch::Keep);
    assert_eq!(patch, Patch::Set(1));
}

#[test]
fn apply_to_overwrites_slot() {
    let mut slot = "old".to_owned();
    Patch::Set("new".to_owned()).apply_to(&mut slot);
    assert_eq!(slot, "new");

    Patch::Keep.apply_to(&mut slot);
    assert_eq!(slot, "new");
}

#[test]
fn retain_change_drops_no_op_set() {
    assert_eq!(Patch::Set(5).retain_change(&5), Patch::Keep);
    assert_eq!(Patch::Set(5).retain_change(&4), Patch::Set(5));
}

// ── NodePatch ────────────────────────────────────────────────────

#[test]
fn new_patch_is_empty() {
    assert!(NodePatch::new().is_empty());
}

#[test]
fn single_set_field_is_not_empty() {
    let patch = NodePatch {
        name: Patch::Set("renamed".to_owned()),
        ..NodePatch::default()
    };
    assert!(!patch.is_empty());
}

#[test]
fn apply_changes_only_set_fields() {
    let original = make_node("before");
    let mut node = original.clone();

    let patch = NodePatch {
        name: Patch::Set("after".to_owned()),
        ..NodePatch::default()
    };
    patch.apply(&mut node);

    assert_eq!(node.name, "after");
    // every other field is untouched
    assert_eq!(node.login, original.login);
    assert_eq!(node.key, original.key);
    assert_eq!(node.regex, original.regex);
    assert_eq!(node.parent_id, original.parent_id);
    assert_eq!(node.order_index, original.order_index);
    assert_eq!(node.length, original.length);
    assert_eq!(node.upper_latin, original.upper_latin);
    assert_eq!(node.kind, original.kind);
}

#[test]
fn set_to_default_still_overwrites() {
    let mut node = make_node("named");
    let patch = NodePatch {
        name: Patch::Set(String::new()),
        ..NodePatch::default()
    };
    patch.apply(&mut node);
    assert_eq!(node.name, "");
}

#[test]
fn apply_can_reparent_to_root() {
    let mut node = make_node("child");
    node.parent_id = Some(NodeId::new());

    let patch = NodePatch {
        parent_id: Patch::Set(None),
        ..NodePatch::default()
    };
    patch.apply(&mut node);
    assert_eq!(node.parent_id, None);
}

#[test]
fn merge_is_last_write_wins_per_field() {
    let mut first = NodePatch {
        name: Patch::Set("first".to_owned()),
        order_index: Patch::Set(1),
        ..NodePatch::default()
    };
    let second = NodePatch {
        name: Patch::Set("second".to_owned()),
        login: Patch::Set("bob".to_owned()),
        ..NodePatch::default()
    };

    first.merge(second);

    assert_eq!(first.name, Patch::Set("second".to_owned()));
    assert_eq!(first.order_index, Patch::Set(1));
    assert_eq!(first.login, Patch::Set("bob".to_owned()));
}

#[test]
fn full_patch_overwrites_everything() {
    let source = make_node("source");
    let mut target = PolicyNode::new(source.id);
    target.kind = NodeKind::FOLDER;

    NodePatch::full(&source).apply(&mut target);
    assert_eq!(target, source);
}

#[test]
fn retain_changes_drops_fields_matching_current() {
    let node = make_node("same");
    let patch = NodePatch {
        name: Patch::Set("same".to_owned()),
        length: Patch::Set(999),
        ..NodePatch::default()
    };

    let retained = patch.retain_changes(&node);
    assert_eq!(retained.name, Patch::Keep);
    assert_eq!(retained.length, Patch::Set(999));
}

#[test]
fn retain_changes_of_full_self_patch_is_empty() {
    let node = make_node("self");
    assert!(NodePatch::full(&node).retain_changes(&node).is_empty());
}

#[test]
fn field_values_cover_set_fields_only() {
    let patch = NodePatch {
        name: Patch::Set("n".to_owned()),
        digits: Patch::Set(true),
        parent_id: Patch::Set(None),
        ..NodePatch::default()
    };

    let pairs = patch.field_values().unwrap();
    let fields: Vec<&str> = pairs.iter().map(|(f, _)| *f).collect();
    assert_eq!(fields, vec!["parent_id", "name", "digits"]);

    let value_of = |field: &str| {
        pairs
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(value_of("name"), "\"n\"");
    assert_eq!(value_of("digits"), "true");
    assert_eq!(value_of("parent_id"), "null");
}

// ── SparseEdit / NodeEdit ────────────────────────────────────────

#[test]
fn sparse_edit_expands_per_target() {
    let ids = vec![NodeId::new(), NodeId::new(), NodeId::new()];
    let patch = NodePatch {
        login: Patch::Set("shared".to_owned()),
        ..NodePatch::default()
    };
    let edit = SparseEdit::new(ids.clone(), patch.clone());

    let expanded = edit.expand();
    assert_eq!(expanded.len(), 3);
    for (node_edit, id) in expanded.iter().zip(&ids) {
        assert_eq!(node_edit.id, *id);
        assert_eq!(node_edit.patch, patch);
    }
}

#[test]
fn sparse_edit_with_no_targets_expands_to_nothing() {
    let edit = SparseEdit::new(Vec::new(), NodePatch::new());
    assert!(edit.expand().is_empty());
}

#[test]
fn node_edit_serde_roundtrip() {
    let edit = NodeEdit::new(
        NodeId::new(),
        NodePatch {
            regex: Patch::Set("[a-z]+".to_owned()),
            special_symbols: Patch::Set(false),
            ..NodePatch::default()
        },
    );
    let json = serde_json::to_string(&edit).unwrap();
    let parsed: NodeEdit = serde_json::from_str(&json).unwrap();
    assert_eq!(edit, parsed);
}

#[test]
fn omitted_patch_fields_deserialize_as_keep() {
    let json = r#"{"name":{"set":"only-name"}}"#;
    let patch: NodePatch = serde_json::from_str(json).unwrap();
    assert_eq!(patch.name, Patch::Set("only-name".to_owned()));
    assert_eq!(patch.login, Patch::Keep);
    assert_eq!(patch.order_index, Patch::Keep);
}
