//! Write path: validation, atomic node storage, and lookups.
//!
//! [`add_node`] is the single entry point for node creation. It validates the
//! typed body, then inserts the node row, the FTS5 row, and the embedding
//! vector inside one transaction: a node is never persisted without a
//! retrievable embedding. Nodes are immutable once written.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{KnowledgeError, Result};
use crate::knowledge::types::{new_node_id, Node, NodeBody, NodeKind};

/// Result returned from a node store operation.
#[derive(Debug, Serialize)]
pub struct StoreNodeResult {
    /// The generated node id (e.g. `D-1a2b3c4d`).
    pub id: String,
    pub kind: String,
    pub created_at: String,
}

/// Full write path: validate → insert node + FTS row + embedding in one tx.
pub fn add_node(
    conn: &mut Connection,
    body: &NodeBody,
    source: Option<&str>,
    project: Option<&str>,
    embedding: &[f32],
) -> Result<StoreNodeResult> {
    body.validate()?;

    let kind = body.kind();
    let id = new_node_id(kind);
    let content = body.search_text();
    let fields = body.to_json()?;
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO nodes (id, kind, content, fields, source, project, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, kind.as_str(), content, fields, source, project, now],
    )?;
    let rowid = tx.last_insert_rowid();

    // FTS row must share the node's rowid (external-content table)
    tx.execute(
        "INSERT INTO nodes_fts (rowid, content, id, kind) VALUES (?1, ?2, ?3, ?4)",
        params![rowid, content, id, kind.as_str()],
    )?;

    tx.execute(
        "INSERT INTO nodes_vec (id, embedding) VALUES (?1, ?2)",
        params![id, super::embedding_to_bytes(embedding)],
    )?;

    tx.commit()?;

    tracing::debug!(id = %id, kind = %kind, "node stored");

    Ok(StoreNodeResult {
        id,
        kind: kind.as_str().to_string(),
        created_at: now,
    })
}

/// Fetch a single node by id. Returns [`KnowledgeError::NotFound`] for
/// unknown ids.
pub fn get_node(conn: &Connection, id: &str) -> Result<Node> {
    let row = conn
        .query_row(
            "SELECT id, kind, content, fields, source, project, created_at \
             FROM nodes WHERE id = ?1",
            params![id],
            map_node_row,
        )
        .optional()?;

    match row {
        Some(parts) => node_from_parts(parts),
        None => Err(KnowledgeError::NotFound(id.to_string())),
    }
}

/// Check whether a node id exists.
pub fn node_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM nodes WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Batch-fetch node records by id. Missing ids are silently absent from the map.
pub fn fetch_nodes(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, Node>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, kind, content, fields, source, project, created_at \
         FROM nodes WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let sql_params: Vec<&dyn rusqlite::types::ToSql> = ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(sql_params.as_slice(), map_node_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut map = HashMap::new();
    for parts in rows {
        let node = node_from_parts(parts)?;
        map.insert(node.id.clone(), node);
    }
    Ok(map)
}

/// Raw column tuple pulled out of a `nodes` row before body parsing.
type NodeRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn map_node_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn node_from_parts(parts: NodeRow) -> Result<Node> {
    let (id, kind_str, content, fields, source, project, created_at) = parts;
    let kind = NodeKind::from_str(&kind_str)
        .map_err(|e| KnowledgeError::validation("kind", e))?;
    let body = NodeBody::from_json(kind, &fields)?;
    Ok(Node {
        id,
        kind,
        content,
        body,
        source,
        project,
        created_at,
    })
}
