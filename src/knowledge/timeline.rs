//! Chronological views of the graph, optionally narrowed to a topic.

use rusqlite::Connection;
use serde::Serialize;

use crate::config::SearchConfig;
use crate::error::{KnowledgeError, Result};
use crate::knowledge::search::{search, SearchOptions};
use crate::rerank::Reranker;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub start: String,
    pub end: String,
}

/// Nodes created in `[start, end]`, oldest first, ties broken by id.
///
/// A non-empty `topic` narrows the range to hybrid-search matches; the topic
/// search runs without a timeframe so the range intersection happens exactly
/// once, here.
pub fn timeline(
    conn: &Connection,
    topic: &str,
    start: &str,
    end: &str,
    query_embedding: Option<&[f32]>,
    reranker: Option<&dyn Reranker>,
    config: &SearchConfig,
) -> Result<Timeline> {
    let start_ts = chrono::DateTime::parse_from_rfc3339(start).map_err(|e| {
        KnowledgeError::validation("start", format!("invalid start '{start}': {e}"))
    })?;
    let end_ts = chrono::DateTime::parse_from_rfc3339(end)
        .map_err(|e| KnowledgeError::validation("end", format!("invalid end '{end}': {e}")))?;
    if start_ts > end_ts {
        return Err(KnowledgeError::validation("start", "start is after end"));
    }

    let mut entries: Vec<TimelineEntry> = if topic.trim().is_empty() {
        let mut stmt = conn.prepare(
            "SELECT id, kind, content, created_at FROM nodes \
             WHERE created_at >= ?1 AND created_at <= ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![start, end], |row| {
                Ok(TimelineEntry {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    } else {
        let options = SearchOptions {
            limit: Some(config.timeline_candidates),
            ..Default::default()
        };
        let response = search(conn, topic, query_embedding, reranker, &options, config)?;
        response
            .results
            .into_iter()
            .filter(|hit| hit.created_at.as_str() >= start && hit.created_at.as_str() <= end)
            .map(|hit| TimelineEntry {
                id: hit.id,
                kind: hit.kind,
                content: hit.content,
                created_at: hit.created_at,
            })
            .collect()
    };

    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    Ok(Timeline {
        entries,
        start: start.to_string(),
        end: end.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::store::add_node;
    use crate::knowledge::types::{Decision, NodeBody};

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    fn spike(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 384];
        v[dim] = 1.0;
        v
    }

    fn add_at(conn: &mut Connection, text: &str, dim: usize, created_at: &str) -> String {
        let body = NodeBody::Decision(Decision {
            description: text.into(),
            rationale: None,
            alternatives: vec![],
            related_to: vec![],
        });
        let id = add_node(conn, &body, None, None, &spike(dim)).unwrap().id;
        conn.execute(
            "UPDATE nodes SET created_at = ?1 WHERE id = ?2",
            rusqlite::params![created_at, id],
        )
        .unwrap();
        id
    }

    #[test]
    fn empty_topic_returns_all_in_range_ascending() {
        let mut conn = test_db();
        let b = add_at(&mut conn, "second", 0, "2025-02-01T00:00:00+00:00");
        let a = add_at(&mut conn, "first", 1, "2025-01-01T00:00:00+00:00");
        add_at(&mut conn, "outside", 2, "2024-01-01T00:00:00+00:00");

        let timeline = timeline(
            &conn,
            "",
            "2025-01-01T00:00:00+00:00",
            "2025-12-31T00:00:00+00:00",
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap();
        let ids: Vec<&str> = timeline.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str()]);
    }

    #[test]
    fn topic_narrows_then_range_intersects() {
        let mut conn = test_db();
        let hit = add_at(&mut conn, "database migration plan", 0, "2025-03-01T00:00:00+00:00");
        add_at(&mut conn, "database migration plan again", 1, "2020-01-01T00:00:00+00:00");
        add_at(&mut conn, "unrelated frontend styling", 2, "2025-03-02T00:00:00+00:00");

        let timeline = timeline(
            &conn,
            "database migration",
            "2025-01-01T00:00:00+00:00",
            "2025-12-31T00:00:00+00:00",
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap();
        let ids: Vec<&str> = timeline.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![hit.as_str()]);
    }

    #[test]
    fn malformed_dates_rejected() {
        let conn = test_db();
        let err = timeline(
            &conn,
            "",
            "not-a-date",
            "2025-12-31T00:00:00+00:00",
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KnowledgeError::Validation { field: "start", .. }));
    }

    #[test]
    fn inverted_range_rejected() {
        let conn = test_db();
        let err = timeline(
            &conn,
            "",
            "2025-12-31T00:00:00+00:00",
            "2025-01-01T00:00:00+00:00",
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KnowledgeError::Validation { .. }));
    }
}
