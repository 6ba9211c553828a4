#![allow(dead_code)]

use rusqlite::Connection;
use tacit::db;
use tacit::error::Result;
use tacit::knowledge::judge::{Judgment, RelationshipJudge};
use tacit::knowledge::store::add_node;
use tacit::knowledge::types::{Decision, Failure, NodeBody, Pattern};
use tacit::rerank::Reranker;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Deterministic 384-dim unit vector with a spike at `seed`. Distinct seeds
/// are orthogonal.
pub fn spike_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[seed % 384] = 1.0;
    v
}

/// Unit vector whose cosine similarity to `spike_embedding(seed)` is exactly
/// `cosine`, built by blending in an orthogonal spike.
pub fn blended_embedding(seed: usize, cosine: f32) -> Vec<f32> {
    let other = (seed + 191) % 384;
    let mut v = vec![0.0f32; 384];
    v[seed % 384] = cosine;
    v[other] = (1.0 - cosine * cosine).sqrt();
    v
}

pub fn insert_decision(conn: &mut Connection, description: &str, embedding: &[f32]) -> String {
    let body = NodeBody::Decision(Decision {
        description: description.into(),
        rationale: None,
        alternatives: vec![],
        related_to: vec![],
    });
    add_node(conn, &body, None, Some("default"), embedding)
        .unwrap()
        .id
}

pub fn insert_pattern(
    conn: &mut Connection,
    name: &str,
    implementation: &str,
    context: &str,
    embedding: &[f32],
) -> String {
    let body = NodeBody::Pattern(Pattern {
        name: name.into(),
        implementation: implementation.into(),
        context: context.into(),
        use_cases: vec![],
    });
    add_node(conn, &body, None, Some("default"), embedding)
        .unwrap()
        .id
}

pub fn insert_failure(
    conn: &mut Connection,
    attempt: &str,
    reason: &str,
    lesson: &str,
    embedding: &[f32],
) -> String {
    let body = NodeBody::Failure(Failure {
        attempt: attempt.into(),
        reason_failed: reason.into(),
        lesson_learned: lesson.into(),
        alternative_solution: None,
    });
    add_node(conn, &body, None, Some("default"), embedding)
        .unwrap()
        .id
}

/// Judge that always returns the same verdict.
pub struct StubJudge(pub Judgment);

impl RelationshipJudge for StubJudge {
    fn classify(&self, _: &str, _: &str) -> Result<Judgment> {
        Ok(self.0.clone())
    }
}

/// Reranker that scores candidates by how many query words they contain.
pub struct WordOverlapReranker;

impl Reranker for WordOverlapReranker {
    fn score_pairs(&self, query: &str, candidates: &[&str]) -> anyhow::Result<Vec<f32>> {
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        Ok(candidates
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                words.iter().filter(|w| lower.contains(w.as_str())).count() as f32
            })
            .collect())
    }
}

/// Reranker that always fails, for degraded-path tests.
pub struct BrokenReranker;

impl Reranker for BrokenReranker {
    fn score_pairs(&self, _: &str, _: &[&str]) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("reranker offline")
    }
}
