//! Relationship extraction: ANN shortlist, similarity threshold, optional
//! judge refinement.
//!
//! Extraction is incremental. Only nodes newer than the state cursor are
//! scanned; each scanned node is compared against its nearest neighbors in
//! embedding space, and any pair above the similarity threshold becomes an
//! edge. Pairs are canonicalized (lexicographically smaller id is the source)
//! so the symmetric comparison from either side lands on the same edge row.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::knowledge::graph::create_edge;
use crate::knowledge::judge::RelationshipJudge;
use crate::knowledge::state::ExtractionState;
use crate::knowledge::types::EdgeKind;

#[derive(Debug, Default, Serialize)]
pub struct ExtractReport {
    /// Nodes newer than the cursor that were scanned this run.
    pub nodes_scanned: usize,
    /// Neighbor pairs that cleared the similarity threshold.
    pub candidates: usize,
    pub edges_created: usize,
    pub edges_deduplicated: usize,
    pub judge_refined: usize,
    pub judge_failures: usize,
}

struct NewNode {
    id: String,
    content: String,
    created_at: String,
}

/// Run one extraction pass and advance the cursor in `state`.
///
/// The caller owns persisting `state` afterwards; a judge failure on one pair
/// downgrades that pair to a similarity edge and the batch continues.
pub fn extract(
    conn: &Connection,
    state: &mut ExtractionState,
    judge: Option<&dyn RelationshipJudge>,
    config: &ExtractionConfig,
) -> Result<ExtractReport> {
    let new_nodes = nodes_after(conn, state.last_sync_timestamp.as_deref())?;
    let total_nodes: usize = conn
        .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        .map(|n: i64| n as usize)?;

    let mut report = ExtractReport {
        nodes_scanned: new_nodes.len(),
        ..Default::default()
    };
    let mut cursor: Option<String> = None;

    for node in &new_nodes {
        if cursor.as_deref().is_none_or(|c| node.created_at.as_str() > c) {
            cursor = Some(node.created_at.clone());
        }

        let Some(embedding) = node_embedding(conn, &node.id)? else {
            continue;
        };

        // k+1 because the node itself is its own nearest neighbor
        for (neighbor_id, similarity) in
            nearest_neighbors(conn, &embedding, config.shortlist_k + 1)?
        {
            if neighbor_id == node.id || similarity < config.threshold {
                continue;
            }
            report.candidates += 1;

            let (source, target) = if node.id < neighbor_id {
                (node.id.as_str(), neighbor_id.as_str())
            } else {
                (neighbor_id.as_str(), node.id.as_str())
            };

            let verdict = match judge {
                Some(judge) => {
                    let neighbor_text = node_content(conn, &neighbor_id)?;
                    match judge.classify(&node.content, &neighbor_text) {
                        Ok(judgment) if judgment.confidence >= config.judge_min_confidence => {
                            Some(judgment)
                        }
                        Ok(judgment) => {
                            tracing::debug!(
                                source,
                                target,
                                confidence = judgment.confidence,
                                "judge verdict below confidence floor"
                            );
                            None
                        }
                        Err(e) => {
                            tracing::warn!(source, target, error = %e, "judge failed, keeping similarity edge");
                            report.judge_failures += 1;
                            None
                        }
                    }
                }
                None => None,
            };

            let created = match verdict {
                Some(judgment) => {
                    let created = create_edge(
                        conn,
                        source,
                        target,
                        judgment.kind,
                        judgment.confidence,
                        true,
                        Some(&judgment.reasoning),
                    )?;
                    if !created.deduplicated {
                        report.judge_refined += 1;
                    }
                    created
                }
                None => create_edge(
                    conn,
                    source,
                    target,
                    EdgeKind::SemanticallySimilar,
                    similarity,
                    false,
                    None,
                )?,
            };

            if created.deduplicated {
                report.edges_deduplicated += 1;
            } else {
                report.edges_created += 1;
            }
        }
    }

    state.record_sync(cursor, total_nodes, report.nodes_scanned, report.edges_created);

    tracing::info!(
        scanned = report.nodes_scanned,
        created = report.edges_created,
        deduplicated = report.edges_deduplicated,
        "extraction pass complete"
    );
    Ok(report)
}

fn nodes_after(conn: &Connection, cursor: Option<&str>) -> Result<Vec<NewNode>> {
    let (sql, bind): (&str, Vec<&dyn rusqlite::types::ToSql>) = match &cursor {
        Some(ts) => (
            "SELECT id, content, created_at FROM nodes WHERE created_at > ?1 \
             ORDER BY created_at, id",
            vec![ts as &dyn rusqlite::types::ToSql],
        ),
        None => (
            "SELECT id, content, created_at FROM nodes ORDER BY created_at, id",
            vec![],
        ),
    };
    let mut stmt = conn.prepare(sql)?;
    let nodes = stmt
        .query_map(bind.as_slice(), |row| {
            Ok(NewNode {
                id: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(nodes)
}

fn node_embedding(conn: &Connection, id: &str) -> Result<Option<Vec<u8>>> {
    let blob = conn
        .query_row(
            "SELECT embedding FROM nodes_vec WHERE id = ?1",
            params![id],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()?;
    Ok(blob)
}

fn node_content(conn: &Connection, id: &str) -> Result<String> {
    Ok(conn.query_row(
        "SELECT content FROM nodes WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?)
}

/// KNN shortlist returning `(id, cosine similarity)`.
fn nearest_neighbors(
    conn: &Connection,
    embedding: &[u8],
    k: usize,
) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM nodes_vec WHERE embedding MATCH ?1 AND k = ?2 \
         ORDER BY distance",
    )?;
    let rows = stmt
        .query_map(params![embedding, k as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|(id, dist)| (id, super::l2_to_cosine(dist)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KnowledgeError;
    use crate::knowledge::judge::Judgment;
    use crate::knowledge::store::add_node;
    use crate::knowledge::types::{Decision, NodeBody};

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    /// Two spikes sharing weight: cosine between same-dim vectors is 1.0,
    /// between (a, mix-of-a-and-b) is `w / sqrt(w² + v²)`.
    fn mixed(dim_a: usize, dim_b: usize, w_a: f32, w_b: f32) -> Vec<f32> {
        let norm = (w_a * w_a + w_b * w_b).sqrt();
        let mut v = vec![0.0f32; 384];
        v[dim_a] = w_a / norm;
        v[dim_b] = w_b / norm;
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

    fn edge_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .unwrap()
    }

    struct FixedJudge(Judgment);
    impl RelationshipJudge for FixedJudge {
        fn classify(&self, _: &str, _: &str) -> crate::error::Result<Judgment> {
            Ok(self.0.clone())
        }
    }

    struct FailingJudge;
    impl RelationshipJudge for FailingJudge {
        fn classify(&self, _: &str, _: &str) -> crate::error::Result<Judgment> {
            Err(KnowledgeError::BackendUnavailable("judge offline".into()))
        }
    }

    #[test]
    fn links_similar_pair_above_threshold() {
        let mut conn = test_db();
        // cosine(a, b) = 0.9 / sqrt(0.9² + 0.436²) ≈ 0.9
        let a = add_decision(&mut conn, "cache invalidation approach", &mixed(0, 1, 1.0, 0.0));
        let b = add_decision(&mut conn, "cache refresh approach", &mixed(0, 1, 0.9, 0.436));
        add_decision(&mut conn, "unrelated topic", &mixed(5, 6, 1.0, 0.0));

        let mut state = ExtractionState::default();
        let report = extract(&conn, &mut state, None, &ExtractionConfig::default()).unwrap();

        assert_eq!(report.nodes_scanned, 3);
        assert_eq!(report.edges_created, 1);

        let (source, target, kind): (String, String, String) = conn
            .query_row(
                "SELECT source_id, target_id, kind FROM edges",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(kind, "SEMANTICALLY_SIMILAR");
        // canonical direction regardless of insertion order
        assert_eq!(source, a.clone().min(b.clone()));
        assert_eq!(target, a.max(b));
    }

    #[test]
    fn second_run_is_idempotent_and_incremental() {
        let mut conn = test_db();
        add_decision(&mut conn, "entry one", &mixed(0, 1, 1.0, 0.0));
        add_decision(&mut conn, "entry two", &mixed(0, 1, 0.95, 0.312));

        let mut state = ExtractionState::default();
        let config = ExtractionConfig::default();
        let first = extract(&conn, &mut state, None, &config).unwrap();
        assert_eq!(first.edges_created, 1);
        assert!(state.last_sync_timestamp.is_some());

        let second = extract(&conn, &mut state, None, &config).unwrap();
        assert_eq!(second.nodes_scanned, 0);
        assert_eq!(second.edges_created, 0);
        assert_eq!(edge_count(&conn), 1);
        assert_eq!(state.total_syncs, 2);
    }

    #[test]
    fn judge_refines_edge_kind() {
        let mut conn = test_db();
        add_decision(&mut conn, "entry one", &mixed(0, 1, 1.0, 0.0));
        add_decision(&mut conn, "entry two", &mixed(0, 1, 0.95, 0.312));

        let judge = FixedJudge(Judgment {
            kind: EdgeKind::Implements,
            confidence: 0.8,
            reasoning: "B implements A".into(),
        });
        let mut state = ExtractionState::default();
        let report =
            extract(&conn, &mut state, Some(&judge), &ExtractionConfig::default()).unwrap();
        assert_eq!(report.judge_refined, 1);

        let (kind, llm, reasoning): (String, bool, Option<String>) = conn
            .query_row(
                "SELECT kind, llm_classified, reasoning FROM edges",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(kind, "IMPLEMENTS");
        assert!(llm);
        assert_eq!(reasoning.as_deref(), Some("B implements A"));
    }

    #[test]
    fn low_confidence_verdict_falls_back_to_similarity() {
        let mut conn = test_db();
        add_decision(&mut conn, "entry one", &mixed(0, 1, 1.0, 0.0));
        add_decision(&mut conn, "entry two", &mixed(0, 1, 0.95, 0.312));

        let judge = FixedJudge(Judgment {
            kind: EdgeKind::DependsOn,
            confidence: 0.2,
            reasoning: "unsure".into(),
        });
        let mut state = ExtractionState::default();
        let report =
            extract(&conn, &mut state, Some(&judge), &ExtractionConfig::default()).unwrap();
        assert_eq!(report.judge_refined, 0);
        assert_eq!(report.edges_created, 1);

        let kind: String = conn
            .query_row("SELECT kind FROM edges", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kind, "SEMANTICALLY_SIMILAR");
    }

    #[test]
    fn judge_failure_does_not_abort_batch() {
        let mut conn = test_db();
        add_decision(&mut conn, "entry one", &mixed(0, 1, 1.0, 0.0));
        add_decision(&mut conn, "entry two", &mixed(0, 1, 0.95, 0.312));
        add_decision(&mut conn, "entry three", &mixed(4, 5, 1.0, 0.0));
        add_decision(&mut conn, "entry four", &mixed(4, 5, 0.95, 0.312));

        let mut state = ExtractionState::default();
        let report = extract(
            &conn,
            &mut state,
            Some(&FailingJudge),
            &ExtractionConfig::default(),
        )
        .unwrap();
        assert!(report.judge_failures >= 2);
        assert_eq!(report.edges_created, 2);
        assert_eq!(edge_count(&conn), 2);
    }

    #[test]
    fn below_threshold_pairs_ignored() {
        let mut conn = test_db();
        // cosine(a, b) = 0.5: well under the 0.7 default
        add_decision(&mut conn, "entry one", &mixed(0, 1, 1.0, 0.0));
        add_decision(&mut conn, "entry two", &mixed(0, 1, 0.5, 0.866));

        let mut state = ExtractionState::default();
        let report = extract(&conn, &mut state, None, &ExtractionConfig::default()).unwrap();
        assert_eq!(report.edges_created, 0);
        assert_eq!(edge_count(&conn), 0);
    }
}
