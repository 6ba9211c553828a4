//! Persistent engineering knowledge graph for AI agents, served over MCP.
//!
//! tacit captures three kinds of engineering knowledge as graph nodes:
//!
//! | Kind | Captures | Id prefix |
//! |------|----------|-----------|
//! | **Decision** | What was decided, why, rejected alternatives | `D-` |
//! | **Pattern** | A reusable approach and when it applies | `P-` |
//! | **Failure** | What was tried, why it failed, the lesson | `F-` |
//!
//! Relationships between nodes are typed, weighted edges, mostly produced by
//! the offline extraction pass (embedding similarity, optionally refined by
//! an LLM judge).
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search and
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for vector search
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Search**: Keyword + vector + graph-expansion passes fused by weighted
//!   sum, reranked by a local ms-marco cross-encoder
//! - **Transport**: MCP over stdio (primary) or streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment variable overrides
//! - [`db`]: SQLite initialization, schema, and migrations
//! - [`embedding`]: text-to-vector pipeline via ONNX Runtime
//! - [`rerank`]: cross-encoder reranking of search candidates
//! - [`knowledge`]: the graph engine: store, search, extract, gaps, timeline
//! - [`error`]: the crate-wide error taxonomy

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod rerank;
