//! SQL DDL for all tacit tables.
//!
//! Defines the `nodes`, `nodes_fts` (FTS5), `nodes_vec` (vec0), `edges`, and
//! `schema_meta` tables. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// All schema DDL statements for tacit's core tables.
const SCHEMA_SQL: &str = r#"
-- Knowledge nodes: decisions, patterns, failures.
-- `content` is the concatenated searchable text; `fields` holds the
-- type-specific body as JSON. Nodes are immutable after insert.
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('decision','pattern','failure')),
    content TEXT NOT NULL,
    fields TEXT NOT NULL,
    source TEXT,
    project TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);
CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes(project);
CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at);

-- Full-text search (BM25)
CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
    content,
    id UNINDEXED,
    kind UNINDEXED,
    content='nodes',
    content_rowid='rowid'
);

-- Typed, weighted relationship graph. Self-loops are rejected; the unique
-- constraint makes extraction idempotent on the (source, target, kind) triple.
CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK(kind IN (
        'SEMANTICALLY_SIMILAR','IMPLEMENTS','DEPENDS_ON',
        'ADDRESSES','SIMILAR_TO','REFERENCES'
    )),
    weight REAL NOT NULL CHECK(weight >= 0.0 AND weight <= 1.0),
    llm_classified INTEGER NOT NULL DEFAULT 0,
    reasoning TEXT,
    created_at TEXT NOT NULL,
    CHECK(source_id <> target_id),
    UNIQUE(source_id, target_id, kind)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// vec0 virtual table must be created separately (sqlite-vec syntax).
const VEC_TABLE_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS nodes_vec USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[384]
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(VEC_TABLE_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"nodes".to_string()));
        assert!(tables.contains(&"edges".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));

        // Verify the vec extension is live
        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn edges_reject_self_loops() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO nodes (id, kind, content, fields, created_at) \
             VALUES ('D-aaaaaaaa', 'decision', 'x', '{}', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO edges (id, source_id, target_id, kind, weight, llm_classified, created_at) \
             VALUES ('e1', 'D-aaaaaaaa', 'D-aaaaaaaa', 'REFERENCES', 0.5, 0, '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
