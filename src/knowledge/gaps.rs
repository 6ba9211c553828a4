//! Structural gap detection over the knowledge graph.
//!
//! Three gap classes: isolated nodes (one gap per node), small weakly
//! connected clusters, and missing cross-type bridges (decisions no pattern
//! implements, failures nothing addresses). Bridge nodes are surfaced via
//! Brandes betweenness centrality as informational output, not gaps.
//!
//! All iteration runs over sorted node ids so repeated runs on the same graph
//! produce identical reports.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::GapsConfig;
use crate::error::Result;
use crate::knowledge::graph::{adjacency, list_edges};
use crate::knowledge::types::{EdgeKind, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    IsolatedNode,
    WeakCluster,
    MissingBridge,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gap {
    pub kind: GapKind,
    pub severity: Severity,
    pub description: String,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BridgeNode {
    pub id: String,
    /// Normalized betweenness centrality in [0, 1].
    pub centrality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_degree: f64,
    pub density: f64,
    pub component_count: usize,
    pub largest_component: usize,
    /// Fraction of nodes with at least one edge.
    pub connectivity: f64,
}

#[derive(Debug, Serialize)]
pub struct GapReport {
    pub gaps: Vec<Gap>,
    pub bridge_nodes: Vec<BridgeNode>,
    pub metrics: GraphMetrics,
}

/// Analyze the whole graph and report structural gaps.
pub fn detect_gaps(conn: &Connection, config: &GapsConfig) -> Result<GapReport> {
    let mut stmt = conn.prepare("SELECT id, kind FROM nodes ORDER BY id")?;
    let nodes = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let edges = list_edges(conn)?;
    let adj = adjacency(&edges);

    let node_count = nodes.len();
    let edge_count = edges.len();
    let mut gaps = Vec::new();

    // Isolated nodes, one gap each
    let mut isolated = 0usize;
    for (id, kind) in &nodes {
        if !adj.contains_key(id) {
            isolated += 1;
            gaps.push(Gap {
                kind: GapKind::IsolatedNode,
                severity: Severity::High,
                description: format!("{kind} {id} has no relationships"),
                node_ids: vec![id.clone()],
            });
        }
    }

    // Weakly connected components
    let components = connected_components(&nodes, &adj);
    let largest_component = components.iter().map(Vec::len).max().unwrap_or(0);
    if components.len() > 1 {
        let cutoff = config.cluster_fraction * node_count as f64;
        for component in &components {
            if component.len() >= 2 && (component.len() as f64) < cutoff {
                gaps.push(Gap {
                    kind: GapKind::WeakCluster,
                    severity: Severity::Medium,
                    description: format!(
                        "cluster of {} nodes disconnected from the main graph",
                        component.len()
                    ),
                    node_ids: component.clone(),
                });
            }
        }
    }

    // Cross-type bridges
    let implemented = endpoint_set(&edges, EdgeKind::Implements);
    let addressed = endpoint_set(&edges, EdgeKind::Addresses);
    let unimplemented: Vec<String> = nodes
        .iter()
        .filter(|(id, kind)| kind == NodeKind::Decision.as_str() && !implemented.contains(id))
        .map(|(id, _)| id.clone())
        .collect();
    if !unimplemented.is_empty() {
        gaps.push(Gap {
            kind: GapKind::MissingBridge,
            severity: Severity::Medium,
            description: format!(
                "{} decision(s) with no implementing pattern",
                unimplemented.len()
            ),
            node_ids: unimplemented,
        });
    }
    let unaddressed: Vec<String> = nodes
        .iter()
        .filter(|(id, kind)| kind == NodeKind::Failure.as_str() && !addressed.contains(id))
        .map(|(id, _)| id.clone())
        .collect();
    if !unaddressed.is_empty() {
        gaps.push(Gap {
            kind: GapKind::MissingBridge,
            severity: Severity::Medium,
            description: format!("{} failure(s) nothing addresses", unaddressed.len()),
            node_ids: unaddressed,
        });
    }

    // Bridge nodes via betweenness centrality
    let centrality = betweenness(&nodes, &adj);
    let mut bridge_nodes: Vec<BridgeNode> = centrality
        .into_iter()
        .filter(|(_, score)| *score > config.betweenness_threshold)
        .map(|(id, centrality)| BridgeNode { id, centrality })
        .collect();
    bridge_nodes.sort_by(|a, b| b.centrality.total_cmp(&a.centrality).then(a.id.cmp(&b.id)));
    bridge_nodes.truncate(config.bridge_top_k);

    let metrics = GraphMetrics {
        node_count,
        edge_count,
        avg_degree: if node_count == 0 {
            0.0
        } else {
            2.0 * edge_count as f64 / node_count as f64
        },
        density: if node_count < 2 {
            0.0
        } else {
            2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
        },
        component_count: components.len(),
        largest_component,
        connectivity: if node_count == 0 {
            1.0
        } else {
            1.0 - isolated as f64 / node_count as f64
        },
    };

    Ok(GapReport {
        gaps,
        bridge_nodes,
        metrics,
    })
}

/// Connected components over the undirected graph, each sorted by id,
/// ordered by their smallest member.
fn connected_components(
    nodes: &[(String, String)],
    adj: &HashMap<String, Vec<String>>,
) -> Vec<Vec<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut components = Vec::new();

    for (id, _) in nodes {
        if seen.contains(id.as_str()) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([id.as_str()]);
        seen.insert(id.as_str());
        while let Some(current) = queue.pop_front() {
            component.push(current.to_string());
            if let Some(neighbors) = adj.get(current) {
                for neighbor in neighbors {
                    if seen.insert(neighbor.as_str()) {
                        queue.push_back(neighbor.as_str());
                    }
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

/// Node ids touched by an edge of the given kind, from either end.
fn endpoint_set(
    edges: &[crate::knowledge::types::Edge],
    kind: EdgeKind,
) -> HashSet<String> {
    let mut set = HashSet::new();
    for edge in edges.iter().filter(|e| e.kind == kind) {
        set.insert(edge.source_id.clone());
        set.insert(edge.target_id.clone());
    }
    set
}

/// Brandes betweenness centrality, unweighted and undirected, normalized by
/// `(n-1)(n-2)/2`.
fn betweenness(
    nodes: &[(String, String)],
    adj: &HashMap<String, Vec<String>>,
) -> HashMap<String, f64> {
    let ids: Vec<&str> = nodes.iter().map(|(id, _)| id.as_str()).collect();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let n = ids.len();
    let mut score = vec![0.0f64; n];

    let neighbors: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| {
            adj.get(*id)
                .map(|ns| ns.iter().filter_map(|n| index.get(n.as_str()).copied()).collect())
                .unwrap_or_default()
        })
        .collect();

    for source in 0..n {
        let mut stack = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];
        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &neighbors[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                score[w] += delta[w];
            }
        }
    }

    // Each undirected pair was counted from both endpoints
    let norm = if n > 2 {
        (n - 1) as f64 * (n - 2) as f64
    } else {
        1.0
    };
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.to_string(), score[i] / norm))
        .collect()
}
