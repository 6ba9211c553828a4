mod helpers;

use helpers::{insert_decision, insert_failure, insert_pattern, spike_embedding, test_db};
use tacit::error::KnowledgeError;
use tacit::knowledge::store::{add_node, get_node};
use tacit::knowledge::types::{Decision, Failure, NodeBody, NodeKind, Pattern};

#[test]
fn id_prefixes_follow_node_kind() {
    let mut conn = test_db();
    let d = insert_decision(&mut conn, "choose grpc for internal calls", &spike_embedding(0));
    let p = insert_pattern(
        &mut conn,
        "bulkhead",
        "separate thread pools per dependency",
        "shared infrastructure under mixed load",
        &spike_embedding(1),
    );
    let f = insert_failure(
        &mut conn,
        "single shared pool",
        "one slow dependency starved the rest",
        "isolate pools per dependency",
        &spike_embedding(2),
    );

    assert!(d.starts_with("D-") && d.len() == 10);
    assert!(p.starts_with("P-") && p.len() == 10);
    assert!(f.starts_with("F-") && f.len() == 10);
}

#[test]
fn stored_node_is_immediately_retrievable() {
    let mut conn = test_db();
    let id = insert_decision(&mut conn, "adopt trunk based development", &spike_embedding(0));

    let node = get_node(&conn, &id).unwrap();
    assert_eq!(node.kind, NodeKind::Decision);
    assert!(node.content.contains("trunk based development"));
    assert!(chrono::DateTime::parse_from_rfc3339(&node.created_at).is_ok());
}

#[test]
fn empty_decision_description_rejected() {
    let mut conn = test_db();
    let body = NodeBody::Decision(Decision {
        description: "   ".into(),
        rationale: Some("has a rationale but nothing decided".into()),
        alternatives: vec![],
        related_to: vec![],
    });
    let err = add_node(&mut conn, &body, None, None, &spike_embedding(0)).unwrap_err();
    assert!(matches!(err, KnowledgeError::Validation { field: "description", .. }));
}

#[test]
fn pattern_context_length_enforced() {
    let mut conn = test_db();
    let body = NodeBody::Pattern(Pattern {
        name: "saga".into(),
        implementation: "compensating transactions".into(),
        context: "short".into(),
        use_cases: vec![],
    });
    let err = add_node(&mut conn, &body, None, None, &spike_embedding(0)).unwrap_err();
    assert!(matches!(err, KnowledgeError::Validation { field: "context", .. }));
}

#[test]
fn failure_requires_all_three_fields() {
    let mut conn = test_db();
    let body = NodeBody::Failure(Failure {
        attempt: "optimistic locking".into(),
        reason_failed: "".into(),
        lesson_learned: "measure contention first".into(),
        alternative_solution: None,
    });
    let err = add_node(&mut conn, &body, None, None, &spike_embedding(0)).unwrap_err();
    assert!(matches!(err, KnowledgeError::Validation { .. }));
}

#[test]
fn failed_validation_leaves_no_partial_rows() {
    let mut conn = test_db();
    let body = NodeBody::Decision(Decision {
        description: "".into(),
        rationale: None,
        alternatives: vec![],
        related_to: vec![],
    });
    let _ = add_node(&mut conn, &body, None, None, &spike_embedding(0));

    for table in ["nodes", "nodes_vec"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "{table} should be empty");
    }
}

#[test]
fn unknown_node_id_is_not_found() {
    let conn = test_db();
    let err = get_node(&conn, "D-00000000").unwrap_err();
    assert!(matches!(err, KnowledgeError::NotFound(id) if id == "D-00000000"));
}
