pub mod extract;
pub mod gaps;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const HF_BASE: &str = "https://huggingface.co";
const EMBEDDING_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const RERANK_REPO: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// Download both ONNX models (embedder and reranker) with their tokenizers
/// into the cache directory, one subdirectory per model.
pub async fn model_download(config: &crate::config::TacitConfig) -> Result<()> {
    let embed_dir = crate::embedding::local::model_dir(&config.embedding);
    let rerank_dir =
        crate::config::expand_tilde(&config.rerank.cache_dir).join(&config.rerank.model);

    let downloads = [
        (EMBEDDING_REPO, embed_dir.join("model.onnx"), "onnx/model.onnx"),
        (EMBEDDING_REPO, embed_dir.join("tokenizer.json"), "tokenizer.json"),
        (RERANK_REPO, rerank_dir.join("model.onnx"), "onnx/model.onnx"),
        (RERANK_REPO, rerank_dir.join("tokenizer.json"), "tokenizer.json"),
    ];

    for (repo, dest, file) in downloads {
        if dest.exists() {
            println!("Already present: {}", dest.display());
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let url = format!("{HF_BASE}/{repo}/resolve/main/{file}");
        println!("Downloading {repo}/{file}...");
        download_file(&url, &dest).await?;
        println!("Saved to {}", dest.display());
    }

    println!("Model download complete.");
    Ok(())
}

/// Download a single file with a progress bar. Writes through a temp file and
/// renames so an interrupted download never leaves a partial model behind.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;
    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {} for {url}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("download");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let bytes = response.bytes().await.context("error reading response body")?;
    pb.inc(bytes.len() as u64);
    file.write_all(&bytes).await.context("error writing model file")?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .with_context(|| format!("failed to move {} into place", tmp_path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

/// Exclusive lock file held for the duration of a CLI write operation.
/// Released on drop; a stale file from a crashed run must be removed by hand.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn acquire(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => anyhow::bail!(
                "another extraction appears to be running (lock file {} exists); \
                 remove it if that run crashed",
                path.display()
            ),
            Err(e) => {
                Err(e).with_context(|| format!("failed to create lock file {}", path.display()))
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}
