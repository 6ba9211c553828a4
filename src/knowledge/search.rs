//! Hybrid retrieval: keyword, vector, and graph passes fused by weighted sum,
//! optionally reranked by a cross-encoder.
//!
//! Each pass produces scores in [0, 1]; fusion sums them under the configured
//! pass weights. Timeframe and kind filters apply before reranking so the
//! reranker only sees candidates that can actually be returned.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::SearchConfig;
use crate::error::{KnowledgeError, Result};
use crate::knowledge::store::fetch_nodes;
use crate::knowledge::types::NodeKind;
use crate::rerank::Reranker;

/// Caller-facing query options; tuning knobs live in [`SearchConfig`].
#[derive(Debug, Default, Clone)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub kinds: Vec<NodeKind>,
    pub project: Option<String>,
    /// RFC 3339 inclusive range on `created_at`.
    pub timeframe: Option<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub score: f64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// True when the vector pass could not run (no embedding backend).
    pub degraded: bool,
    /// True when results were not cross-encoder reranked.
    pub unranked: bool,
    /// Candidates that survived filtering, before the limit was applied.
    pub total_matched: usize,
}

struct Candidate {
    fused: f64,
    snippet: Option<String>,
}

/// Run the full hybrid pipeline.
///
/// `query_embedding` is `None` when no embedding backend is available; the
/// response is then marked `degraded` and keyword + graph passes carry the
/// ranking alone. An empty query falls back to recency ordering.
pub fn search(
    conn: &Connection,
    query: &str,
    query_embedding: Option<&[f32]>,
    reranker: Option<&dyn Reranker>,
    options: &SearchOptions,
    config: &SearchConfig,
) -> Result<SearchResponse> {
    let timeframe = validate_timeframe(options.timeframe.as_ref())?;
    let limit = options.limit.unwrap_or(config.default_limit);

    if query.trim().is_empty() {
        return recent_nodes(conn, options, limit, timeframe.as_ref());
    }

    let mut candidates: HashMap<String, Candidate> = HashMap::new();
    let degraded = query_embedding.is_none();

    // Pass 1: FTS5 keyword
    for (id, score, snippet) in keyword_search(conn, query, config.candidate_k)? {
        let entry = candidates.entry(id).or_insert(Candidate {
            fused: 0.0,
            snippet: None,
        });
        entry.fused += config.keyword_weight * score;
        entry.snippet = Some(snippet);
    }

    // Pass 2: vector KNN
    if let Some(embedding) = query_embedding {
        for (id, cosine) in vector_search(conn, embedding, config.candidate_k)? {
            candidates
                .entry(id)
                .or_insert(Candidate {
                    fused: 0.0,
                    snippet: None,
                })
                .fused += config.vector_weight * cosine;
        }
    }

    // Pass 3: graph expansion seeded from the strongest direct hits
    let mut seeds: Vec<(&String, f64)> = candidates
        .iter()
        .map(|(id, c)| (id, c.fused))
        .collect();
    seeds.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
    let seed_ids: Vec<String> = seeds
        .into_iter()
        .take(config.graph_seeds)
        .map(|(id, _)| id.clone())
        .collect();
    for seed in &seed_ids {
        for (id, score) in graph_expand(conn, seed, config.graph_hops)? {
            if id == *seed {
                continue;
            }
            candidates
                .entry(id)
                .or_insert(Candidate {
                    fused: 0.0,
                    snippet: None,
                })
                .fused += config.graph_weight * score;
        }
    }

    // Resolve candidates to nodes and apply filters before reranking
    let ids: Vec<String> = candidates.keys().cloned().collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let nodes = fetch_nodes(conn, &id_refs)?;

    let mut hits: Vec<SearchHit> = Vec::new();
    for (id, candidate) in candidates {
        let Some(node) = nodes.get(&id) else { continue };
        if !options.kinds.is_empty() && !options.kinds.contains(&node.kind) {
            continue;
        }
        if let Some(project) = &options.project {
            if node.project.as_deref() != Some(project.as_str()) {
                continue;
            }
        }
        if let Some((start, end)) = &timeframe {
            if node.created_at.as_str() < start.as_str()
                || node.created_at.as_str() > end.as_str()
            {
                continue;
            }
        }
        hits.push(SearchHit {
            id,
            kind: node.kind.as_str().to_string(),
            content: node.content.clone(),
            score: candidate.fused,
            created_at: node.created_at.clone(),
            snippet: candidate.snippet,
        });
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    let total_matched = hits.len();

    if hits.is_empty() {
        return Ok(SearchResponse {
            results: hits,
            degraded,
            unranked: true,
            total_matched: 0,
        });
    }

    let unranked = match reranker {
        Some(reranker) => !rerank(reranker, query, &mut hits, config.rerank_candidates),
        None => true,
    };

    hits.truncate(limit);
    Ok(SearchResponse {
        results: hits,
        degraded,
        unranked,
        total_matched,
    })
}

/// Rerank the top candidates in place. Returns false when the reranker failed
/// and the fused ordering was kept.
fn rerank(reranker: &dyn Reranker, query: &str, hits: &mut [SearchHit], top: usize) -> bool {
    let n = hits.len().min(top);
    if n == 0 {
        return true;
    }
    let texts: Vec<&str> = hits[..n].iter().map(|h| h.content.as_str()).collect();
    match reranker.score_pairs(query, &texts) {
        Ok(scores) if scores.len() == n => {
            for (hit, score) in hits[..n].iter_mut().zip(&scores) {
                hit.score = *score as f64;
            }
            hits[..n].sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
            true
        }
        Ok(_) => {
            tracing::warn!("reranker returned wrong score count, keeping fused order");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "rerank failed, keeping fused order");
            false
        }
    }
}

/// FTS5 pass. Returns `(id, score, snippet)` where score is the reciprocal
/// of the bm25 rank position, so the best match scores 1.0.
fn keyword_search(
    conn: &Connection,
    query: &str,
    k: usize,
) -> Result<Vec<(String, f64, String)>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(
        "SELECT id, snippet(nodes_fts, 0, '[', ']', '…', 12) \
         FROM nodes_fts WHERE nodes_fts MATCH ?1 ORDER BY rank LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![escaped, k as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(position, (id, snippet))| (id, 1.0 / (1.0 + position as f64), snippet))
        .collect())
}

/// vec0 KNN pass. Returns `(id, cosine similarity)`.
fn vector_search(conn: &Connection, embedding: &[f32], k: usize) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM nodes_vec WHERE embedding MATCH ?1 AND k = ?2 \
         ORDER BY distance",
    )?;
    let rows = stmt
        .query_map(
            params![super::embedding_to_bytes(embedding), k as i64],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|(id, dist)| (id, super::l2_to_cosine(dist)))
        .collect())
}

/// Graph pass: BFS from `seed` scoring each reached node by the product of
/// edge weights along its discovery path, divided by hop count.
fn graph_expand(conn: &Connection, seed: &str, max_hops: usize) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT source_id, target_id, weight FROM edges WHERE source_id = ?1 OR target_id = ?1",
    )?;

    let mut best: HashMap<String, (f64, usize)> = HashMap::new();
    best.insert(seed.to_string(), (1.0, 0));
    let mut frontier = vec![seed.to_string()];

    for hop in 1..=max_hops {
        let mut next = Vec::new();
        for current in &frontier {
            let (path_weight, _) = best[current];
            let rows = stmt
                .query_map(params![current], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for (source, target, weight) in rows {
                let neighbor = if &source == current { target } else { source };
                if !best.contains_key(&neighbor) {
                    best.insert(neighbor.clone(), (path_weight * weight, hop));
                    next.push(neighbor);
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    Ok(best
        .into_iter()
        .filter(|(id, _)| id != seed)
        .map(|(id, (weight, hops))| (id, weight / hops as f64))
        .collect())
}

/// Recency fallback for empty queries.
fn recent_nodes(
    conn: &Connection,
    options: &SearchOptions,
    limit: usize,
    timeframe: Option<&(String, String)>,
) -> Result<SearchResponse> {
    let mut sql = String::from(
        "SELECT id, kind, content, created_at FROM nodes WHERE 1=1",
    );
    let mut sql_params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if !options.kinds.is_empty() {
        let placeholders: Vec<String> = options
            .kinds
            .iter()
            .map(|kind| {
                sql_params.push(Box::new(kind.as_str().to_string()));
                format!("?{}", sql_params.len())
            })
            .collect();
        sql.push_str(&format!(" AND kind IN ({})", placeholders.join(", ")));
    }
    if let Some(project) = &options.project {
        sql_params.push(Box::new(project.clone()));
        sql.push_str(&format!(" AND project = ?{}", sql_params.len()));
    }
    if let Some((start, end)) = timeframe {
        sql_params.push(Box::new(start.clone()));
        sql.push_str(&format!(" AND created_at >= ?{}", sql_params.len()));
        sql_params.push(Box::new(end.clone()));
        sql.push_str(&format!(" AND created_at <= ?{}", sql_params.len()));
    }
    sql_params.push(Box::new(limit as i64));
    sql.push_str(&format!(
        " ORDER BY created_at DESC, id LIMIT ?{}",
        sql_params.len()
    ));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        sql_params.iter().map(|p| p.as_ref()).collect();
    let results = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(SearchHit {
                id: row.get(0)?,
                kind: row.get(1)?,
                content: row.get(2)?,
                score: 0.0,
                created_at: row.get(3)?,
                snippet: None,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total_matched = results.len();
    Ok(SearchResponse {
        results,
        degraded: false,
        unranked: true,
        total_matched,
    })
}

/// Quote each whitespace token so user input cannot inject FTS5 syntax.
/// Tokens are ORed; bm25 still ranks fuller matches first.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn validate_timeframe(
    timeframe: Option<&(String, String)>,
) -> Result<Option<(String, String)>> {
    let Some((start, end)) = timeframe else {
        return Ok(None);
    };
    let start_ts = chrono::DateTime::parse_from_rfc3339(start).map_err(|e| {
        KnowledgeError::validation("timeframe", format!("invalid start '{start}': {e}"))
    })?;
    let end_ts = chrono::DateTime::parse_from_rfc3339(end).map_err(|e| {
        KnowledgeError::validation("timeframe", format!("invalid end '{end}': {e}"))
    })?;
    if start_ts > end_ts {
        return Err(KnowledgeError::validation(
            "timeframe",
            "start is after end",
        ));
    }
    Ok(Some((start.clone(), end.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::store::add_node;
    use crate::knowledge::types::{Decision, EdgeKind, NodeBody};

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    fn spike(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 384];
        v[dim] = 1.0;
        v
    }

    fn add_decision(conn: &mut Connection, text: &str, embedding: &[f32]) -> String {
        let body = NodeBody::Decision(Decision {
            description: text.into(),
            rationale: None,
            alternatives: vec![],
            related_to: vec![],
        });
        add_node(conn, &body, None, None, embedding).unwrap().id
    }

    fn config() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn escapes_fts_operators() {
        assert_eq!(escape_fts_query("a NOT b"), "\"a\" OR \"NOT\" OR \"b\"");
        assert_eq!(escape_fts_query("say \"hi\""), "\"say\" OR \"\"\"hi\"\"\"");
    }

    #[test]
    fn keyword_match_ranks_above_unrelated() {
        let mut conn = test_db();
        let hit = add_decision(&mut conn, "adopt sqlite for local persistence", &spike(0));
        add_decision(&mut conn, "rotate api keys quarterly", &spike(1));

        let response = search(
            &conn,
            "sqlite persistence",
            None,
            None,
            &SearchOptions::default(),
            &config(),
        )
        .unwrap();
        assert!(response.degraded);
        assert!(response.unranked);
        assert_eq!(response.results[0].id, hit);
        assert!(response.results[0].snippet.is_some());
    }

    #[test]
    fn vector_pass_surfaces_semantic_match() {
        let mut conn = test_db();
        let close = add_decision(&mut conn, "first entry", &spike(3));
        add_decision(&mut conn, "second entry", &spike(7));

        let response = search(
            &conn,
            "nothing lexical",
            Some(&spike(3)),
            None,
            &SearchOptions::default(),
            &config(),
        )
        .unwrap();
        assert!(!response.degraded);
        assert_eq!(response.results[0].id, close);
        // exact cosine match scores vector_weight * 1.0
        assert!((response.results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn graph_pass_pulls_in_neighbors_of_hits() {
        let mut conn = test_db();
        let hit = add_decision(&mut conn, "use write ahead logging", &spike(0));
        let neighbor = add_decision(&mut conn, "unrelated wording entirely", &spike(1));
        crate::knowledge::graph::create_edge(
            &conn,
            &hit,
            &neighbor,
            EdgeKind::DependsOn,
            0.8,
            false,
            None,
        )
        .unwrap();

        let response = search(
            &conn,
            "write ahead logging",
            None,
            None,
            &SearchOptions::default(),
            &config(),
        )
        .unwrap();
        let ids: Vec<&str> = response.results.iter().map(|h| h.id.as_str()).collect();
        assert!(ids.contains(&hit.as_str()));
        assert!(ids.contains(&neighbor.as_str()));
        assert_eq!(ids[0], hit.as_str());
    }

    #[test]
    fn timeframe_filters_before_limit() {
        let mut conn = test_db();
        let id = add_decision(&mut conn, "timeboxed entry", &spike(0));
        // Push the row far into the past
        conn.execute(
            "UPDATE nodes SET created_at = '2020-01-01T00:00:00+00:00' WHERE id = ?1",
            params![id],
        )
        .unwrap();

        let options = SearchOptions {
            timeframe: Some((
                "2024-01-01T00:00:00+00:00".into(),
                "2024-12-31T23:59:59+00:00".into(),
            )),
            ..Default::default()
        };
        let response = search(&conn, "timeboxed entry", None, None, &options, &config()).unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.total_matched, 0);
    }

    #[test]
    fn malformed_timeframe_is_validation_error() {
        let conn = test_db();
        let options = SearchOptions {
            timeframe: Some(("yesterday".into(), "today".into())),
            ..Default::default()
        };
        let err = search(&conn, "x", None, None, &options, &config()).unwrap_err();
        assert!(matches!(err, KnowledgeError::Validation { field: "timeframe", .. }));
    }

    #[test]
    fn inverted_timeframe_is_validation_error() {
        let conn = test_db();
        let options = SearchOptions {
            timeframe: Some((
                "2025-06-01T00:00:00+00:00".into(),
                "2025-01-01T00:00:00+00:00".into(),
            )),
            ..Default::default()
        };
        let err = search(&conn, "x", None, None, &options, &config()).unwrap_err();
        assert!(matches!(err, KnowledgeError::Validation { .. }));
    }

    #[test]
    fn empty_query_returns_most_recent() {
        let mut conn = test_db();
        let older = add_decision(&mut conn, "older entry", &spike(0));
        conn.execute(
            "UPDATE nodes SET created_at = '2023-01-01T00:00:00+00:00' WHERE id = ?1",
            params![older],
        )
        .unwrap();
        let newer = add_decision(&mut conn, "newer entry", &spike(1));

        let response = search(&conn, "  ", None, None, &SearchOptions::default(), &config())
            .unwrap();
        assert_eq!(response.results[0].id, newer);
        assert_eq!(response.results[1].id, older);
        assert!(response.unranked);
    }

    #[test]
    fn limit_truncates_fused_results() {
        let mut conn = test_db();
        for i in 0..5 {
            add_decision(&mut conn, &format!("shared keyword entry {i}"), &spike(i));
        }
        let options = SearchOptions {
            limit: Some(2),
            ..Default::default()
        };
        let response = search(&conn, "shared keyword", None, None, &options, &config()).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.total_matched, 5);
    }
}
