//! SQLite-backed implementation of the node store.
//!
//! One `rusqlite::Connection` serves the whole store; sessions take the
//! connection mutex for their entire lifetime, so concurrent requests are
//! serialized at the store boundary and never interleave inside a
//! transaction.

use crate::error::StoreResult;
use crate::store::{NodeStore, StoreSession};
use async_trait::async_trait;
use keygrove_types::{
    ActorId, Event, EventDraft, EventId, HybridTimestamp, IdempotencyToken, NodeEdit, NodeId,
    NodeKind, NodePatch, Patch, PolicyNode,
};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

const NODE_COLUMNS: &str = "id, parent_id, order_index, name, login, key, regex, \
     custom_available_characters, upper_latin, lower_latin, digits, special_symbols, \
     length, kind";

const EVENT_COLUMNS: &str =
    "id, entity_id, entity_type, field, value, actor_id, token, ts_wall, ts_logical";

/// Node store backed by a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn new(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl NodeStore for SqliteStore {
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>> {
        let conn = self.conn.clone().lock_owned().await;
        Ok(Box::new(SqliteSession {
            conn,
            in_txn: false,
        }))
    }
}

/// A session holding the store's connection for the duration of a request.
pub struct SqliteSession {
    conn: OwnedMutexGuard<Connection>,
    in_txn: bool,
}

#[async_trait]
impl StoreSession for SqliteSession {
    // ── Transaction control ──────────────────────────────────────

    async fn begin(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_txn = true;
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.in_txn = false;
        Ok(())
    }

    // ── Node queries ─────────────────────────────────────────────

    async fn load_nodes(&mut self, ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM policy_node WHERE id IN ({}) ORDER BY order_index, id",
            placeholders(ids.len())
        );
        select_nodes(&self.conn, &sql, params_from_iter(id_strings(ids)))
    }

    async fn load_roots(&mut self) -> StoreResult<Vec<PolicyNode>> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM policy_node WHERE parent_id IS NULL \
             ORDER BY order_index, id"
        );
        select_nodes(&self.conn, &sql, [])
    }

    async fn load_children(&mut self, parent_ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM policy_node WHERE parent_id IN ({}) \
             ORDER BY order_index, id",
            placeholders(parent_ids.len())
        );
        select_nodes(&self.conn, &sql, params_from_iter(id_strings(parent_ids)))
    }

    async fn load_siblings(&mut self, parent: Option<NodeId>) -> StoreResult<Vec<PolicyNode>> {
        match parent {
            Some(parent_id) => {
                let sql = format!(
                    "SELECT {NODE_COLUMNS} FROM policy_node WHERE parent_id = ?1 \
                     ORDER BY order_index, id"
                );
                select_nodes(&self.conn, &sql, params![parent_id.to_string()])
            }
            None => self.load_roots().await,
        }
    }

    async fn load_ancestor_closure(&mut self, ids: &[NodeId]) -> StoreResult<Vec<PolicyNode>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // UNION (not UNION ALL) dedups visited rows, so a parent cycle in
        // the stored graph terminates the recursion instead of looping.
        let sql = format!(
            "WITH RECURSIVE lineage AS ( \
                 SELECT {NODE_COLUMNS} FROM policy_node WHERE id IN ({}) \
                 UNION \
                 SELECT t.id, t.parent_id, t.order_index, t.name, t.login, t.key, t.regex, \
                        t.custom_available_characters, t.upper_latin, t.lower_latin, t.digits, \
                        t.special_symbols, t.length, t.kind \
                 FROM policy_node t INNER JOIN lineage l ON t.id = l.parent_id \
             ) \
             SELECT {NODE_COLUMNS} FROM lineage ORDER BY id",
            placeholders(ids.len())
        );
        select_nodes(&self.conn, &sql, params_from_iter(id_strings(ids)))
    }

    async fn existing_ids(&mut self, ids: &[NodeId]) -> StoreResult<HashSet<NodeId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let sql = format!(
            "SELECT id FROM policy_node WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(id_strings(ids)), |row| {
            row.get::<_, String>(0)
        })?;
        let mut existing = HashSet::new();
        for row in rows {
            existing.insert(NodeId::parse(&row?)?);
        }
        Ok(existing)
    }

    // ── Node mutations ───────────────────────────────────────────

    async fn insert(&mut self, nodes: &[PolicyNode]) -> StoreResult<()> {
        for node in nodes {
            self.conn.execute(
                "INSERT INTO policy_node (id, parent_id, order_index, name, login, key, regex, \
                 custom_available_characters, upper_latin, lower_latin, digits, special_symbols, \
                 length, kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    node.id.to_string(),
                    node.parent_id.map(|p| p.to_string()),
                    node.order_index,
                    node.name,
                    node.login,
                    node.key,
                    node.regex,
                    node.custom_available_characters,
                    node.upper_latin,
                    node.lower_latin,
                    node.digits,
                    node.special_symbols,
                    node.length,
                    node.kind.as_i64(),
                ],
            )?;
        }
        Ok(())
    }

    async fn update(&mut self, edits: &[NodeEdit]) -> StoreResult<()> {
        for edit in edits {
            let assignments = patch_assignments(&edit.patch);
            if assignments.is_empty() {
                continue;
            }
            let set_clause = assignments
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("UPDATE policy_node SET {set_clause} WHERE id = ?");
            let mut values: Vec<Value> = assignments.into_iter().map(|(_, value)| value).collect();
            values.push(Value::Text(edit.id.to_string()));
            self.conn.execute(&sql, params_from_iter(values))?;
        }
        Ok(())
    }

    async fn delete(&mut self, ids: &[NodeId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "DELETE FROM policy_node WHERE id IN ({})",
            placeholders(ids.len())
        );
        self.conn.execute(&sql, params_from_iter(id_strings(ids)))?;
        Ok(())
    }

    // ── Event log ────────────────────────────────────────────────

    async fn append_events(
        &mut self,
        token: IdempotencyToken,
        drafts: Vec<EventDraft>,
    ) -> StoreResult<Vec<Event>> {
        let seen: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sync_event WHERE token = ?1)",
            params![token.to_string()],
            |row| row.get(0),
        )?;
        if seen {
            debug!(
                "token {} already in event log, dropping {} drafted events",
                token,
                drafts.len()
            );
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity(drafts.len());
        for draft in drafts {
            self.conn.execute(
                "INSERT INTO sync_event (entity_id, entity_type, field, value, actor_id, token, \
                 ts_wall, ts_logical) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    draft.entity_id.to_string(),
                    draft.entity_type,
                    draft.field,
                    draft.value,
                    draft.actor_id.to_string(),
                    draft.token.to_string(),
                    draft.timestamp.wall_time() as i64,
                    i64::from(draft.timestamp.logical()),
                ],
            )?;
            let id = EventId::from_raw(self.conn.last_insert_rowid());
            events.push(draft.sequenced(id));
        }
        Ok(events)
    }

    async fn events_after(&mut self, watermark: EventId) -> StoreResult<Vec<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM sync_event WHERE id > ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![watermark.as_i64()], read_event_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(parse_event(row?)?);
        }
        Ok(events)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_txn {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("failed to roll back abandoned session: {e}");
            }
        }
    }
}

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS policy_node (
            id TEXT PRIMARY KEY,
            parent_id TEXT,
            order_index INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL DEFAULT '' CHECK (length(name) <= 255),
            login TEXT NOT NULL DEFAULT '' CHECK (length(login) <= 255),
            key TEXT NOT NULL DEFAULT '' CHECK (length(key) <= 255),
            regex TEXT NOT NULL DEFAULT '' CHECK (length(regex) <= 255),
            custom_available_characters TEXT NOT NULL DEFAULT ''
                CHECK (length(custom_available_characters) <= 1000),
            upper_latin INTEGER NOT NULL DEFAULT 0,
            lower_latin INTEGER NOT NULL DEFAULT 0,
            digits INTEGER NOT NULL DEFAULT 0,
            special_symbols INTEGER NOT NULL DEFAULT 0,
            length INTEGER NOT NULL DEFAULT 0,
            kind INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_policy_node_parent
            ON policy_node(parent_id);

        CREATE TABLE IF NOT EXISTS sync_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            token TEXT NOT NULL,
            ts_wall INTEGER NOT NULL,
            ts_logical INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sync_event_token
            ON sync_event(token);
        ",
    )?;
    Ok(())
}

// ── Row mapping helpers ──────────────────────────────────────────

struct NodeRow {
    id: String,
    parent_id: Option<String>,
    order_index: i64,
    name: String,
    login: String,
    key: String,
    regex: String,
    custom_available_characters: String,
    upper_latin: bool,
    lower_latin: bool,
    digits: bool,
    special_symbols: bool,
    length: i64,
    kind: i64,
}

fn read_node_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRow> {
    Ok(NodeRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        order_index: row.get(2)?,
        name: row.get(3)?,
        login: row.get(4)?,
        key: row.get(5)?,
        regex: row.get(6)?,
        custom_available_characters: row.get(7)?,
        upper_latin: row.get(8)?,
        lower_latin: row.get(9)?,
        digits: row.get(10)?,
        special_symbols: row.get(11)?,
        length: row.get(12)?,
        kind: row.get(13)?,
    })
}

fn parse_node(row: NodeRow) -> StoreResult<PolicyNode> {
    Ok(PolicyNode {
        id: NodeId::parse(&row.id)?,
        parent_id: row.parent_id.as_deref().map(NodeId::parse).transpose()?,
        order_index: row.order_index,
        name: row.name,
        login: row.login,
        key: row.key,
        regex: row.regex,
        custom_available_characters: row.custom_available_characters,
        upper_latin: row.upper_latin,
        lower_latin: row.lower_latin,
        digits: row.digits,
        special_symbols: row.special_symbols,
        length: row.length,
        kind: NodeKind::from_raw(row.kind),
    })
}

fn select_nodes(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Vec<PolicyNode>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read_node_row)?;
    let mut nodes = Vec::new();
    for row in rows {
        nodes.push(parse_node(row?)?);
    }
    Ok(nodes)
}

struct EventRow {
    id: i64,
    entity_id: String,
    entity_type: String,
    field: String,
    value: String,
    actor_id: String,
    token: String,
    ts_wall: i64,
    ts_logical: i64,
}

fn read_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        entity_type: row.get(2)?,
        field: row.get(3)?,
        value: row.get(4)?,
        actor_id: row.get(5)?,
        token: row.get(6)?,
        ts_wall: row.get(7)?,
        ts_logical: row.get(8)?,
    })
}

fn parse_event(row: EventRow) -> StoreResult<Event> {
    Ok(Event {
        id: EventId::from_raw(row.id),
        entity_id: NodeId::parse(&row.entity_id)?,
        entity_type: row.entity_type,
        field: row.field,
        value: row.value,
        actor_id: ActorId::parse(&row.actor_id)?,
        token: IdempotencyToken::parse(&row.token)?,
        timestamp: HybridTimestamp::new(row.ts_wall as u64, row.ts_logical as u32),
    })
}

fn patch_assignments(patch: &NodePatch) -> Vec<(&'static str, Value)> {
    let mut assignments = Vec::new();
    if let Patch::Set(v) = &patch.parent_id {
        let value = match v {
            Some(parent_id) => Value::Text(parent_id.to_string()),
            None => Value::Null,
        };
        assignments.push(("parent_id", value));
    }
    if let Patch::Set(v) = &patch.order_index {
        assignments.push(("order_index", Value::Integer(*v)));
    }
    if let Patch::Set(v) = &patch.name {
        assignments.push(("name", Value::Text(v.clone())));
    }
    if let Patch::Set(v) = &patch.login {
        assignments.push(("login", Value::Text(v.clone())));
    }
    if let Patch::Set(v) = &patch.key {
        assignments.push(("key", Value::Text(v.clone())));
    }
    if let Patch::Set(v) = &patch.regex {
        assignments.push(("regex", Value::Text(v.clone())));
    }
    if let Patch::Set(v) = &patch.custom_available_characters {
        assignments.push(("custom_available_characters", Value::Text(v.clone())));
    }
    if let Patch::Set(v) = &patch.upper_latin {
        assignments.push(("upper_latin", Value::Integer(i64::from(*v))));
    }
    if let Patch::Set(v) = &patch.lower_latin {
        assignments.push(("lower_latin", Value::Integer(i64::from(*v))));
    }
    if let Patch::Set(v) = &patch.digits {
        assignments.push(("digits", Value::Integer(i64::from(*v))));
    }
    if let Patch::Set(v) = &patch.special_symbols {
        assignments.push(("special_symbols", Value::Integer(i64::from(*v))));
    }
    if let Patch::Set(v) = &patch.length {
        assignments.push(("length", Value::Integer(*v)));
    }
    if let Patch::Set(v) = &patch.kind {
        assignments.push(("kind", Value::Integer(v.as_i64())));
    }
    assignments
}

fn placeholders(count: usize) -> String {
    let mut vars = "?,".repeat(count);
    vars.pop();
    vars
}

fn id_strings(ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(NodeId::to_string).collect()
}
