mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod knowledge;
mod rerank;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tacit", version, about = "Engineering knowledge graph MCP server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Transport: "stdio" or "http". Defaults to the configured transport.
        #[arg(long)]
        transport: Option<String>,
    },
    /// Manage the local ONNX models
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Run a relationship extraction pass over new nodes
    Extract {
        /// Similarity threshold override (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,
        /// Classify candidate pairs with the LLM judge
        #[arg(long)]
        judge: bool,
    },
    /// Analyze the graph for structural gaps
    Gaps,
    /// Search the knowledge graph
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show graph statistics
    Stats,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding and reranker models to ~/.tacit/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::TacitConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            let transport = transport.unwrap_or_else(|| config.server.transport.clone());
            match transport.as_str() {
                "stdio" => server::serve_stdio(config).await?,
                "http" => server::serve_http(config).await?,
                other => anyhow::bail!("unknown transport '{other}' (supported: stdio, http)"),
            }
        }
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config).await?,
        },
        Command::Extract { threshold, judge } => {
            cli::extract::run(config, threshold, judge).await?;
        }
        Command::Gaps => cli::gaps::run(&config)?,
        Command::Search { query, limit } => cli::search::run(&config, &query, limit)?,
        Command::Stats => cli::stats::run(&config)?,
    }

    Ok(())
}
