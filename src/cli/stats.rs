//! `tacit stats`: print graph statistics.

use anyhow::Result;

use crate::config::TacitConfig;
use crate::knowledge::stats::collect_stats;

pub fn run(config: &TacitConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;
    let stats = collect_stats(&conn, Some(&db_path))?;

    println!("Nodes: {}", stats.total_nodes);
    for (kind, count) in &stats.nodes_by_kind {
        println!("  {kind}: {count}");
    }
    println!("Edges: {}", stats.total_edges);
    for (kind, count) in &stats.edges_by_kind {
        println!("  {kind}: {count}");
    }
    if stats.total_edges > 0 {
        println!("  llm-classified: {}", stats.llm_classified_edges);
    }
    if let (Some(oldest), Some(newest)) = (&stats.oldest_node, &stats.newest_node) {
        println!("Span: {oldest} .. {newest}");
    }
    println!("Database size: {} bytes", stats.db_size_bytes);
    Ok(())
}
