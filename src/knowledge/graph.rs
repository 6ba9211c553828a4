//! Edge storage and graph traversal.
//!
//! Edges are directed rows but traversal treats the graph as undirected.
//! `UNIQUE(source_id, target_id, kind)` plus a check-then-create path makes
//! edge creation idempotent.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;

use crate::error::{KnowledgeError, Result};
use crate::knowledge::store::node_exists;
use crate::knowledge::types::{Edge, EdgeKind};

/// Result of an edge creation attempt.
#[derive(Debug, Serialize)]
pub struct EdgeCreated {
    pub id: String,
    /// True when an identical (source, target, kind) edge already existed.
    pub deduplicated: bool,
}

/// A node reached by [`find_related`], with the edge kind it was first
/// reached through and its BFS distance from the origin.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedNode {
    pub id: String,
    pub edge_kind: String,
    pub distance: usize,
}

/// Create an edge between two existing nodes.
///
/// Both endpoints must exist ([`KnowledgeError::NotFound`] otherwise) and
/// self-loops are rejected. Re-creating an existing (source, target, kind)
/// triple returns the existing edge id with `deduplicated: true`; the stored
/// weight and reasoning are left untouched.
pub fn create_edge(
    conn: &Connection,
    source_id: &str,
    target_id: &str,
    kind: EdgeKind,
    weight: f64,
    llm_classified: bool,
    reasoning: Option<&str>,
) -> Result<EdgeCreated> {
    if source_id == target_id {
        return Err(KnowledgeError::validation(
            "target_id",
            "self-loops are not allowed",
        ));
    }
    if !(0.0..=1.0).contains(&weight) {
        return Err(KnowledgeError::validation(
            "weight",
            format!("weight {weight} outside [0.0, 1.0]"),
        ));
    }
    if !node_exists(conn, source_id)? {
        return Err(KnowledgeError::NotFound(source_id.to_string()));
    }
    if !node_exists(conn, target_id)? {
        return Err(KnowledgeError::NotFound(target_id.to_string()));
    }

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM edges WHERE source_id = ?1 AND target_id = ?2 AND kind = ?3",
            params![source_id, target_id, kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(EdgeCreated {
            id,
            deduplicated: true,
        });
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO edges (id, source_id, target_id, kind, weight, llm_classified, reasoning, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, source_id, target_id, kind.as_str(), weight, llm_classified, reasoning, now],
    )?;

    tracing::debug!(source = %source_id, target = %target_id, kind = %kind.as_str(), "edge created");

    Ok(EdgeCreated {
        id,
        deduplicated: false,
    })
}

/// All edges in the graph, ordered by creation time then id.
pub fn list_edges(conn: &Connection) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_id, target_id, kind, weight, llm_classified, reasoning, created_at \
         FROM edges ORDER BY created_at, id",
    )?;
    let edges = stmt
        .query_map([], map_edge_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    edges.into_iter().map(edge_from_parts).collect()
}

/// Undirected BFS from `origin` out to `max_depth` hops.
///
/// Returns every reached node (excluding the origin) tagged with the kind of
/// the edge it was first discovered through, ordered by (distance, id).
pub fn find_related(
    conn: &Connection,
    origin: &str,
    max_depth: usize,
) -> Result<Vec<RelatedNode>> {
    if !node_exists(conn, origin)? {
        return Err(KnowledgeError::NotFound(origin.to_string()));
    }
    if max_depth == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT source_id, target_id, kind FROM edges WHERE source_id = ?1 OR target_id = ?1",
    )?;

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(origin.to_string());
    let mut reached: Vec<RelatedNode> = Vec::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((origin.to_string(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let rows = stmt
            .query_map(params![current], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (source, target, kind) in rows {
            let neighbor = if source == current { target } else { source };
            if visited.insert(neighbor.clone()) {
                reached.push(RelatedNode {
                    id: neighbor.clone(),
                    edge_kind: kind,
                    distance: depth + 1,
                });
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    reached.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.id.cmp(&b.id)));
    Ok(reached)
}

/// Undirected adjacency list over all edges, keyed by node id. Nodes without
/// edges are absent; callers merge in the full node set themselves.
pub fn adjacency(edges: &[Edge]) -> HashMap<String, Vec<String>> {
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        adj.entry(edge.source_id.clone())
            .or_default()
            .push(edge.target_id.clone());
        adj.entry(edge.target_id.clone())
            .or_default()
            .push(edge.source_id.clone());
    }
    adj
}

type EdgeRow = (
    String,
    String,
    String,
    String,
    f64,
    bool,
    Option<String>,
    String,
);

fn map_edge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EdgeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn edge_from_parts(parts: EdgeRow) -> Result<Edge> {
    let (id, source_id, target_id, kind_str, weight, llm_classified, reasoning, created_at) = parts;
    let kind = EdgeKind::from_str(&kind_str)
        .map_err(|e| KnowledgeError::validation("kind", e))?;
    Ok(Edge {
        id,
        source_id,
        target_id,
        kind,
        weight,
        llm_classified,
        reasoning,
        created_at,
    })
}
