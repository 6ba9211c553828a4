//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Wires the database, the optional model backends, and the tool handler into
//! a running server. Missing model files do not prevent startup: the server
//! comes up with writes disabled and keyword-only search instead.

use crate::config::TacitConfig;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::rerank::{OnnxCrossEncoder, Reranker};
use crate::tools::TacitTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

type SharedState = (
    Arc<Mutex<rusqlite::Connection>>,
    Option<Arc<dyn EmbeddingProvider>>,
    Option<Arc<dyn Reranker>>,
    Arc<TacitConfig>,
);

/// Open the database and bring up whatever model backends are available.
fn setup_shared_state(config: TacitConfig) -> Result<SharedState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed since the database was created; existing vectors were \
                 produced by the stored model"
            );
        }
    }

    let db = Arc::new(Mutex::new(conn));

    let embedder = match embedding::create_provider(&config.embedding) {
        Ok(provider) => {
            tracing::info!("embedding provider ready");
            Some(provider)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no embedding backend; writes disabled, search degraded");
            None
        }
    };

    let reranker: Option<Arc<dyn Reranker>> = if config.rerank.enabled {
        match OnnxCrossEncoder::new(&config.rerank) {
            Ok(encoder) => {
                tracing::info!("reranker ready");
                Some(Arc::new(encoder))
            }
            Err(e) => {
                tracing::warn!(error = %e, "no reranker; results will be unranked");
                None
            }
        }
    } else {
        None
    };

    Ok((db, embedder, reranker, Arc::new(config)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: TacitConfig) -> Result<()> {
    tracing::info!("starting tacit MCP server on stdio");

    let (db, embedder, reranker, config) = setup_shared_state(config)?;

    let tools = TacitTools::new(db, embedder, reranker, config);
    let server = tools.serve(rmcp::transport::stdio()).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over streamable HTTP transport.
pub async fn serve_http(config: TacitConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting tacit MCP server on HTTP");

    let (db, embedder, reranker, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || {
            Ok(TacitTools::new(
                db.clone(),
                embedder.clone(),
                reranker.clone(),
                config.clone(),
            ))
        },
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
