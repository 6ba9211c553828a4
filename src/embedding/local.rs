//! ONNX Runtime embedder for all-MiniLM-L6-v2.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// all-MiniLM-L6-v2 was trained at 256 tokens; longer inputs are truncated.
const MAX_SEQ_LEN: usize = 256;

pub struct OnnxEmbedder {
    // Session::run takes &mut self
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_dir = model_dir(config);
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            anyhow::ensure!(
                path.exists(),
                "embedding model file missing: {}. Run `tacit model download` first.",
                path.display()
            );
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .with_context(|| format!("failed to load {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
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

        tracing::info!(model = %model_path.display(), "embedding model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

/// Each model gets its own subdirectory of the cache dir.
pub fn model_dir(config: &EmbeddingConfig) -> PathBuf {
    crate::config::expand_tilde(&config.cache_dir).join(&config.model)
}

impl EmbeddingProvider for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned empty batch"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

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
        let token_type_ids = vec![0i64; batch * seq_len];

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?,
        })?;

        // Token-level output shape is [batch, seq, EMBEDDING_DIM]; export name varies
        let hidden = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .unwrap_or_else(|| &outputs[0]);
        let (dims, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract hidden state tensor")?;
        let dims: &[i64] = &dims;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected hidden state shape {dims:?}"
        );
        let out_seq = dims[1] as usize;

        let mut vectors = Vec::with_capacity(batch);
        for b in 0..batch {
            vectors.push(mean_pool(
                &data[b * out_seq * EMBEDDING_DIM..(b + 1) * out_seq * EMBEDDING_DIM],
                &attention_mask[b * seq_len..b * seq_len + out_seq],
            ));
        }
        Ok(vectors)
    }
}

/// Attention-masked mean over token embeddings, L2-normalized.
fn mean_pool(tokens: &[f32], mask: &[i64]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; EMBEDDING_DIM];
    let mut count = 0.0f32;
    for (s, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        count += 1.0;
        let row = &tokens[s * EMBEDDING_DIM..(s + 1) * EMBEDDING_DIM];
        for (acc, x) in pooled.iter_mut().zip(row) {
            *acc += x;
        }
    }
    if count > 0.0 {
        for x in &mut pooled {
            *x /= count;
        }
    }
    l2_normalize(&mut pooled);
    pooled
}

/// In-place L2 normalization; zero vectors stay zero.
fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn mean_pool_respects_mask() {
        // Two tokens, second masked out
        let mut tokens = vec![0.0f32; 2 * EMBEDDING_DIM];
        tokens[0] = 2.0;
        tokens[EMBEDDING_DIM] = 100.0;
        let pooled = mean_pool(&tokens, &[1, 0]);
        // only the first token contributes, then normalized to unit length
        assert!((pooled[0] - 1.0).abs() < 1e-6);
    }

    fn disk_config() -> EmbeddingConfig {
        EmbeddingConfig::default()
    }

    #[test]
    #[ignore] // needs downloaded model files: cargo test -- --ignored
    fn embeds_to_expected_width() {
        let embedder = OnnxEmbedder::new(&disk_config()).unwrap();
        let v = embedder.embed("choose sqlite for local storage").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore]
    fn paraphrases_score_higher_than_unrelated() {
        let embedder = OnnxEmbedder::new(&disk_config()).unwrap();
        let a = embedder.embed("cache invalidation after writes").unwrap();
        let b = embedder.embed("invalidating caches when data changes").unwrap();
        let c = embedder.embed("selecting a css framework").unwrap();
        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(a, b)| a * b).sum() };
        assert!(dot(&a, &b) > dot(&a, &c));
    }
}
