//! `tacit extract`: run one relationship extraction pass.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::TacitConfig;
use crate::knowledge::extract::extract;
use crate::knowledge::judge::{HttpJudge, RelationshipJudge};
use crate::knowledge::state::ExtractionState;

/// Run extraction over nodes added since the last run. `threshold` overrides
/// the configured similarity floor; `use_judge` forces the LLM judge on.
pub async fn run(config: TacitConfig, threshold: Option<f64>, use_judge: bool) -> Result<()> {
    let state_path = config.resolved_state_path();
    let lock_path = state_path.with_file_name("extract.lock");
    let _lock = super::LockFile::acquire(lock_path)?;

    let mut extraction = config.extraction.clone();
    if let Some(threshold) = threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&threshold),
            "threshold must be between 0.0 and 1.0"
        );
        extraction.threshold = threshold;
    }

    let judge: Option<Arc<dyn RelationshipJudge>> = if use_judge || extraction.judge_enabled {
        let judge = HttpJudge::new(
            &extraction.judge_endpoint,
            &extraction.judge_model,
            extraction.judge_timeout_secs,
        )
        .context("failed to build relationship judge")?;
        Some(Arc::new(judge))
    } else {
        None
    };

    let db_path = config.resolved_db_path();
    let mut state = ExtractionState::load(&state_path)?;

    // The judge uses a blocking HTTP client, so the whole pass runs off the
    // async runtime's worker threads.
    let (report, state) = tokio::task::spawn_blocking(move || {
        let conn = crate::db::open_database(&db_path)?;
        let report = extract(&conn, &mut state, judge.as_deref(), &extraction)?;
        anyhow::Ok((report, state))
    })
    .await
    .context("extraction task failed")??;

    state.save(&state_path)?;

    println!("Extraction complete:");
    println!("  nodes scanned:      {}", report.nodes_scanned);
    println!("  candidate pairs:    {}", report.candidates);
    println!("  edges created:      {}", report.edges_created);
    println!("  already existed:    {}", report.edges_deduplicated);
    if report.judge_refined > 0 || report.judge_failures > 0 {
        println!("  judge refined:      {}", report.judge_refined);
        println!("  judge failures:     {}", report.judge_failures);
    }
    Ok(())
}
