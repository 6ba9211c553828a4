//! `tacit search`: run a hybrid search from the command line.

use anyhow::Result;

use crate::config::TacitConfig;
use crate::knowledge::search::{search, SearchOptions};
use crate::rerank::{OnnxCrossEncoder, Reranker};

pub fn run(config: &TacitConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let conn = crate::db::open_database(&config.resolved_db_path())?;

    let query_embedding = match crate::embedding::create_provider(&config.embedding) {
        Ok(provider) => Some(provider.embed(query)?),
        Err(e) => {
            tracing::warn!(error = %e, "no embedding backend, keyword-only search");
            None
        }
    };
    let reranker: Option<Box<dyn Reranker>> = if config.rerank.enabled {
        match OnnxCrossEncoder::new(&config.rerank) {
            Ok(encoder) => Some(Box::new(encoder)),
            Err(e) => {
                tracing::warn!(error = %e, "no reranker, results unranked");
                None
            }
        }
    } else {
        None
    };

    let options = SearchOptions {
        limit,
        ..Default::default()
    };
    let response = search(
        &conn,
        query,
        query_embedding.as_deref(),
        reranker.as_deref(),
        &options,
        &config.search,
    )?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    if response.degraded {
        println!("(keyword-only: no embedding backend)");
    }
    for hit in &response.results {
        let preview: String = hit.content.chars().take(100).collect();
        println!("{:>7.3}  {}  [{}]  {}", hit.score, hit.id, hit.kind, preview);
    }
    Ok(())
}
