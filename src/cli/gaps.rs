//! `tacit gaps`: print a gap analysis of the knowledge graph.

use anyhow::Result;

use crate::config::TacitConfig;
use crate::knowledge::gaps::{detect_gaps, Severity};

pub fn run(config: &TacitConfig) -> Result<()> {
    let conn = crate::db::open_database(&config.resolved_db_path())?;
    let report = detect_gaps(&conn, &config.gaps)?;

    let m = &report.metrics;
    println!(
        "Graph: {} nodes, {} edges, {} component(s), connectivity {:.0}%",
        m.node_count,
        m.edge_count,
        m.component_count,
        m.connectivity * 100.0
    );

    if report.gaps.is_empty() {
        println!("No gaps detected.");
    } else {
        println!("\n{} gap(s):", report.gaps.len());
        for gap in &report.gaps {
            let severity = match gap.severity {
                Severity::High => "HIGH",
                Severity::Medium => "MEDIUM",
            };
            println!("  [{severity}] {}", gap.description);
        }
    }

    if !report.bridge_nodes.is_empty() {
        println!("\nBridge nodes (high betweenness):");
        for bridge in &report.bridge_nodes {
            println!("  {}  {:.3}", bridge.id, bridge.centrality);
        }
    }
    Ok(())
}
