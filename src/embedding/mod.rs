//! Sentence embedding backend.
//!
//! [`EmbeddingProvider`] turns node text into fixed-size vectors for the
//! `nodes_vec` table and the vector search pass. The default backend runs
//! all-MiniLM-L6-v2 locally through ONNX Runtime. Providers are synchronous;
//! async callers wrap them in `tokio::task::spawn_blocking`.

pub mod local;

use std::sync::Arc;

use anyhow::Result;

/// Vector width of all-MiniLM-L6-v2, matching the `nodes_vec` schema.
pub const EMBEDDING_DIM: usize = 384;

/// Embeds text into L2-normalized vectors of [`EMBEDDING_DIM`] dimensions.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Build the provider named in config. Only `"local"` exists today; model
/// files must already be on disk (`tacit model download`).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(local::OnnxEmbedder::new(config)?)),
        other => anyhow::bail!("unknown embedding provider '{other}' (supported: local)"),
    }
}
