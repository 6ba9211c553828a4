//! Aggregate statistics over the graph, for the stats tool and CLI.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Node counts keyed by kind (`decision`, `pattern`, `failure`).
    pub nodes_by_kind: BTreeMap<String, usize>,
    /// Edge counts keyed by relationship kind.
    pub edges_by_kind: BTreeMap<String, usize>,
    pub llm_classified_edges: usize,
    pub oldest_node: Option<String>,
    pub newest_node: Option<String>,
    pub db_size_bytes: u64,
}

pub fn collect_stats(conn: &Connection, db_path: Option<&std::path::Path>) -> Result<GraphStats> {
    let total_nodes: usize = conn
        .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        .map(|n: i64| n as usize)?;
    let total_edges: usize = conn
        .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
        .map(|n: i64| n as usize)?;

    let mut nodes_by_kind = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        nodes_by_kind.insert(kind, count as usize);
    }

    let mut edges_by_kind = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        edges_by_kind.insert(kind, count as usize);
    }

    let llm_classified_edges: usize = conn
        .query_row(
            "SELECT COUNT(*) FROM edges WHERE llm_classified = 1",
            [],
            |row| row.get(0),
        )
        .map(|n: i64| n as usize)?;

    let (oldest_node, newest_node): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM nodes",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(GraphStats {
        total_nodes,
        total_edges,
        nodes_by_kind,
        edges_by_kind,
        llm_classified_edges,
        oldest_node,
        newest_node,
        db_size_bytes,
    })
}
