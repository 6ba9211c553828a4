use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TacitConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub search: SearchConfig,
    pub extraction: ExtractionConfig,
    pub gaps: GapsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub state_path: String,
    pub default_project: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    pub model: String,
    pub cache_dir: String,
}

/// Retrieval knobs for the hybrid search pipeline.
///
/// Fusion is a weighted sum of per-pass scores: the keyword pass contributes
/// a reciprocal-rank score, the vector pass a cosine similarity, and the
/// graph pass a hop-decayed edge-weight score. The weights are tunable here,
/// not hardcoded.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub keyword_weight: f64,
    pub vector_weight: f64,
    pub graph_weight: f64,
    pub candidate_k: usize,
    pub rerank_candidates: usize,
    pub graph_hops: usize,
    pub graph_seeds: usize,
    pub default_limit: usize,
    pub timeline_candidates: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    pub threshold: f64,
    pub shortlist_k: usize,
    pub judge_enabled: bool,
    pub judge_endpoint: String,
    pub judge_model: String,
    pub judge_timeout_secs: u64,
    pub judge_min_confidence: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GapsConfig {
    pub cluster_fraction: f64,
    pub betweenness_threshold: f64,
    pub bridge_top_k: usize,
}

impl Default for TacitConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            rerank: RerankConfig::default(),
            search: SearchConfig::default(),
            extraction: ExtractionConfig::default(),
            gaps: GapsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8736,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_tacit_dir();
        Self {
            db_path: dir.join("knowledge.db").to_string_lossy().into_owned(),
            state_path: dir
                .join("extraction_state.json")
                .to_string_lossy()
                .into_owned(),
            default_project: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_tacit_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        let cache_dir = default_tacit_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            enabled: true,
            model: "ms-marco-MiniLM-L-6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 1.0,
            vector_weight: 1.0,
            graph_weight: 0.5,
            candidate_k: 50,
            rerank_candidates: 20,
            graph_hops: 2,
            graph_seeds: 3,
            default_limit: 10,
            timeline_candidates: 200,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            shortlist_k: 50,
            judge_enabled: false,
            judge_endpoint: "http://localhost:8081/v1".into(),
            judge_model: "qwen2.5-7b-instruct".into(),
            judge_timeout_secs: 30,
            judge_min_confidence: 0.5,
        }
    }
}

impl Default for GapsConfig {
    fn default() -> Self {
        Self {
            cluster_fraction: 0.25,
            betweenness_threshold: 0.1,
            bridge_top_k: 10,
        }
    }
}

/// Returns `~/.tacit/`
pub fn default_tacit_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".tacit")
}

/// Returns the default config file path: `~/.tacit/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tacit_dir().join("config.toml")
}

impl TacitConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TacitConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (TACIT_DB, TACIT_PROJECT, TACIT_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TACIT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TACIT_PROJECT") {
            self.storage.default_project = val;
        }
        if let Ok(val) = std::env::var("TACIT_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the extraction state path, expanding `~` if needed.
    pub fn resolved_state_path(&self) -> PathBuf {
        expand_tilde(&self.storage.state_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TacitConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.default_project, "default");
        assert!((config.extraction.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.search.default_limit, 10);
        assert!(config.storage.db_path.ends_with("knowledge.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"
default_project = "myproject"

[search]
keyword_weight = 2.0
graph_hops = 1

[extraction]
threshold = 0.8
judge_enabled = true
"#;
        let config: TacitConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.storage.default_project, "myproject");
        assert!((config.search.keyword_weight - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.search.graph_hops, 1);
        assert!((config.extraction.threshold - 0.8).abs() < f64::EPSILON);
        assert!(config.extraction.judge_enabled);
        // defaults still apply for unset fields
        assert_eq!(config.search.rerank_candidates, 20);
        assert_eq!(config.extraction.shortlist_k, 50);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = TacitConfig::default();
        std::env::set_var("TACIT_DB", "/tmp/override.db");
        std::env::set_var("TACIT_PROJECT", "env-project");
        std::env::set_var("TACIT_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.default_project, "env-project");
        assert_eq!(config.server.log_level, "trace");

        std::env::remove_var("TACIT_DB");
        std::env::remove_var("TACIT_PROJECT");
        std::env::remove_var("TACIT_LOG_LEVEL");
    }
}
