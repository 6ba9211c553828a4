//! Cross-encoder reranking.
//!
//! A [`Reranker`] scores (query, candidate) pairs jointly; the hybrid search
//! uses it to reorder its top fused candidates. The ONNX implementation runs
//! ms-marco-MiniLM-L-6-v2 locally. Scores are raw relevance logits; only
//! their ordering matters.

use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::config::RerankConfig;

const MAX_SEQ_LEN: usize = 512;

/// Scores query/candidate pairs. Synchronous, like the embedding backend.
pub trait Reranker: Send + Sync {
    /// One score per candidate, higher is more relevant.
    fn score_pairs(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>>;
}

pub struct OnnxCrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxCrossEncoder {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        let model_dir = crate::config::expand_tilde(&config.cache_dir).join(&config.model);
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            anyhow::ensure!(
                path.exists(),
                "reranker model file missing: {}. Run `tacit model download` first.",
                path.display()
            );
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .with_context(|| format!("failed to load {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load reranker tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to configure truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(model = %model_path.display(), "reranker model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl Reranker for OnnxCrossEncoder {
    fn score_pairs(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Cross-encoder input is the query and candidate as one dual sequence
        let pairs: Vec<(String, String)> = candidates
            .iter()
            .map(|c| (query.to_string(), c.to_string()))
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow::anyhow!("pair tokenization failed: {e}"))?;

        let batch = encodings.len();
        let seq_len = encodings[0].get_ids().len();
        let shape = vec![batch as i64, seq_len as i64];

        let input_ids: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().map(|&id| id as i64))
            .collect();
        let attention_mask: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().map(|&m| m as i64))
            .collect();
        // Segment ids distinguish the query from the candidate
        let token_type_ids: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_type_ids().iter().map(|&t| t as i64))
            .collect();

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape.clone(), attention_mask.into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?,
        })?;

        // Single relevance logit per pair: shape [batch, 1]
        let logits = outputs
            .get("logits")
            .unwrap_or_else(|| &outputs[0]);
        let (dims, data) = logits
            .try_extract_tensor::<f32>()
            .context("failed to extract relevance logits")?;
        let dims: &[i64] = &dims;
        anyhow::ensure!(
            dims[0] == batch as i64,
            "unexpected logits shape {dims:?} for batch of {batch}"
        );

        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_config() -> RerankConfig {
        RerankConfig::default()
    }

    #[test]
    #[ignore] // needs downloaded model files: cargo test -- --ignored
    fn relevant_candidate_outscores_irrelevant() {
        let reranker = OnnxCrossEncoder::new(&disk_config()).unwrap();
        let scores = reranker
            .score_pairs(
                "why did the cache migration fail",
                &[
                    "the cache migration failed because of stale keys",
                    "we chose blue for the landing page",
                ],
            )
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    #[ignore]
    fn empty_candidates_yield_empty_scores() {
        let reranker = OnnxCrossEncoder::new(&disk_config()).unwrap();
        assert!(reranker.score_pairs("query", &[]).unwrap().is_empty());
    }
}
