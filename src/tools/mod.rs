pub mod add_decision;
pub mod add_failure;
pub mod add_pattern;
pub mod detect_gaps;
pub mod find_related;
pub mod get_timeline;
pub mod query_decisions;

use add_decision::AddDecisionParams;
use add_failure::AddFailureParams;
use add_pattern::AddPatternParams;
use detect_gaps::DetectGapsParams;
use find_related::FindRelatedParams;
use get_timeline::GetTimelineParams;
use query_decisions::QueryDecisionsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::config::TacitConfig;
use crate::embedding::EmbeddingProvider;
use crate::knowledge::search::SearchOptions;
use crate::knowledge::types::{Decision, Failure, NodeBody, NodeKind, Pattern};
use crate::rerank::Reranker;

/// A traversal result joined with the node it reached.
#[derive(serde::Serialize)]
struct RelatedNodeView {
    id: String,
    kind: String,
    content: String,
    edge_kind: String,
    distance: usize,
}

/// The tacit MCP tool handler. Holds shared state (db connection, embedding
/// provider, reranker, config) and exposes all MCP tools via the
/// `#[tool_router]` macro.
///
/// Both model backends are optional: without an embedder the store tools
/// refuse writes and search runs degraded, without a reranker search results
/// come back `unranked`.
#[derive(Clone)]
pub struct TacitTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
    config: Arc<TacitConfig>,
}

#[tool_router]
impl TacitTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Option<Arc<dyn EmbeddingProvider>>,
        reranker: Option<Arc<dyn Reranker>>,
        config: Arc<TacitConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            embedding,
            reranker,
            config,
        }
    }

    /// Shared write path for the three store tools.
    async fn store_node(
        &self,
        body: NodeBody,
        source: Option<String>,
        project: Option<String>,
    ) -> Result<String, String> {
        let Some(embedding_provider) = self.embedding.clone() else {
            return Err(
                "embedding backend unavailable: writes are disabled. Run `tacit model download` and restart."
                    .into(),
            );
        };

        let content = body.search_text();
        let embedding = tokio::task::spawn_blocking(move || embedding_provider.embed(&content))
            .await
            .map_err(|e| format!("embedding task failed: {e}"))?
            .map_err(|e| format!("embedding failed: {e}"))?;

        let db = Arc::clone(&self.db);
        let project = project.unwrap_or_else(|| self.config.storage.default_project.clone());
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            crate::knowledge::store::add_node(
                &mut conn,
                &body,
                source.as_deref(),
                Some(&project),
                &embedding,
            )
            .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("store failed: {e}"))?;

        tracing::info!(id = %result.id, kind = %result.kind, "node stored");
        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Embed the query text if a backend is present; `None` means degraded.
    async fn embed_query(&self, query: &str) -> Result<Option<Vec<f32>>, String> {
        let Some(provider) = self.embedding.clone() else {
            return Ok(None);
        };
        let text = query.to_string();
        match tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| format!("embedding task failed: {e}"))?
        {
            Ok(vector) => Ok(Some(vector)),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, degrading to keyword search");
                Ok(None)
            }
        }
    }

    /// Record an architectural or technical decision.
    #[tool(
        description = "Record a decision: what was decided, why, and what alternatives were rejected."
    )]
    async fn add_decision(
        &self,
        Parameters(params): Parameters<AddDecisionParams>,
    ) -> Result<String, String> {
        let body = NodeBody::Decision(Decision {
            description: params.description,
            rationale: params.rationale,
            alternatives: params.alternatives.unwrap_or_default(),
            related_to: params.related_to.unwrap_or_default(),
        });
        self.store_node(body, params.source, params.project).await
    }

    /// Record a reusable implementation pattern.
    #[tool(
        description = "Record a reusable pattern: its name, how it is implemented, and when it applies (context, at least 10 characters)."
    )]
    async fn add_pattern(
        &self,
        Parameters(params): Parameters<AddPatternParams>,
    ) -> Result<String, String> {
        let body = NodeBody::Pattern(Pattern {
            name: params.name,
            implementation: params.implementation,
            context: params.context,
            use_cases: params.use_cases.unwrap_or_default(),
        });
        self.store_node(body, params.source, params.project).await
    }

    /// Record a failed approach and its lesson.
    #[tool(
        description = "Record a failed approach: what was tried, why it failed, and the lesson learned."
    )]
    async fn add_failure(
        &self,
        Parameters(params): Parameters<AddFailureParams>,
    ) -> Result<String, String> {
        let body = NodeBody::Failure(Failure {
            attempt: params.attempt,
            reason_failed: params.reason_failed,
            lesson_learned: params.lesson_learned,
            alternative_solution: params.alternative_solution,
        });
        self.store_node(body, params.source, params.project).await
    }

    /// Search the knowledge graph.
    #[tool(
        description = "Search the knowledge graph with hybrid keyword + vector + graph retrieval, cross-encoder reranked. Supports kind, project, and created-at range filters."
    )]
    async fn query_decisions(
        &self,
        Parameters(params): Parameters<QueryDecisionsParams>,
    ) -> Result<String, String> {
        let timeframe = match (params.start, params.end) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => return Err("timeframe requires both 'start' and 'end'".into()),
        };
        let mut kinds = Vec::new();
        for raw in params.kinds.unwrap_or_default() {
            kinds.push(NodeKind::from_str(&raw).map_err(|e| e.to_string())?);
        }
        let query = params.query.unwrap_or_default();

        let query_embedding = if query.trim().is_empty() {
            None
        } else {
            self.embed_query(&query).await?
        };

        let options = SearchOptions {
            limit: params.limit,
            kinds,
            project: params.project,
            timeframe,
        };
        let db = Arc::clone(&self.db);
        let reranker = self.reranker.clone();
        let config = Arc::clone(&self.config);
        let response = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            crate::knowledge::search::search(
                &conn,
                &query,
                query_embedding.as_deref(),
                reranker.as_deref(),
                &options,
                &config.search,
            )
            .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("search failed: {e}"))?;

        tracing::info!(
            results = response.results.len(),
            degraded = response.degraded,
            "query_decisions complete"
        );
        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Traverse the graph outward from one node.
    #[tool(
        description = "Walk the relationship graph outward from a node id, returning reachable nodes with their content, edge kind, and hop distance."
    )]
    async fn find_related(
        &self,
        Parameters(params): Parameters<FindRelatedParams>,
    ) -> Result<String, String> {
        let depth = params.depth.unwrap_or(2);
        let db = Arc::clone(&self.db);
        let related = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            let related = crate::knowledge::graph::find_related(&conn, &params.id, depth)?;
            related
                .into_iter()
                .map(|r| {
                    let node = crate::knowledge::store::get_node(&conn, &r.id)?;
                    Ok(RelatedNodeView {
                        id: r.id,
                        kind: node.kind.as_str().to_string(),
                        content: node.content,
                        edge_kind: r.edge_kind,
                        distance: r.distance,
                    })
                })
                .collect::<crate::error::Result<Vec<_>>>()
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("traversal failed: {e}"))?;

        serde_json::to_string(&related).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Analyze the graph for structural gaps.
    #[tool(
        description = "Analyze the knowledge graph for structural gaps: isolated nodes, disconnected clusters, decisions with no implementing pattern, failures nothing addresses. Includes graph metrics and bridge nodes."
    )]
    async fn detect_gaps(
        &self,
        Parameters(_params): Parameters<DetectGapsParams>,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);
        let report = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            crate::knowledge::gaps::detect_gaps(&conn, &config.gaps).map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("gap analysis failed: {e}"))?;

        tracing::info!(gaps = report.gaps.len(), "detect_gaps complete");
        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Chronological view of the graph, optionally narrowed to a topic.
    #[tool(
        description = "Get a chronological view of knowledge in an RFC 3339 time range, optionally narrowed to a topic by hybrid search."
    )]
    async fn get_timeline(
        &self,
        Parameters(params): Parameters<GetTimelineParams>,
    ) -> Result<String, String> {
        let topic = params.topic.unwrap_or_default();
        let query_embedding = if topic.trim().is_empty() {
            None
        } else {
            self.embed_query(&topic).await?
        };

        let db = Arc::clone(&self.db);
        let reranker = self.reranker.clone();
        let config = Arc::clone(&self.config);
        let timeline = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            crate::knowledge::timeline::timeline(
                &conn,
                &topic,
                &params.start,
                &params.end,
                query_embedding.as_deref(),
                reranker.as_deref(),
                &config.search,
            )
            .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("timeline failed: {e}"))?;

        serde_json::to_string(&timeline).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for TacitTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "tacit is an engineering knowledge graph. Use add_decision, add_pattern, \
                 and add_failure to capture knowledge, query_decisions to retrieve it, \
                 find_related to walk relationships, detect_gaps for structural analysis, \
                 and get_timeline for chronological views."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
