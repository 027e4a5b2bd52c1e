//! Embedding service entrypoint (HTTP).
//!
//! Serves `POST /embed/` backed by the configured embedding provider. The local model is loaded
//! lazily on the first request.
use anyhow::{Context, Result};
use clap::Parser;
use pdfvec::{
    api::{self, EmbeddingService},
    config,
    embedding::build_embedding_client,
    logging::{self, LevelPolicy},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "pdfvec-embed", about = "Text embedding service", version)]
struct Args {
    /// Address to bind (defaults to `HOST`).
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (defaults to `PORT`).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing(
        "embedding-service",
        &config.log_level,
        config.environment,
        LevelPolicy::VerboseInDevelopment,
    );

    let client =
        build_embedding_client(&config.embedding).context("failed to build embedding client")?;
    tracing::info!(model = client.model_name(), dimension = client.dimension(), "Embedding client ready");
    let service = Arc::new(EmbeddingService::new(client));
    let app = api::apply_middleware(
        api::create_embed_router(service, config.environment),
        config,
    );

    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    tracing::info!(host = %host, port, environment = config.environment.as_str(), "Starting Semantic Retrieval Service");
    tracing::info!("Available endpoints:");
    tracing::info!("  - GET  /health - Health check");
    tracing::info!("  - POST /embed/ - Generate an embedding");
    tracing::info!("  - GET  /embed/model - Model information");
    tracing::info!("  - GET  / - Service information");

    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .context("embedding server terminated unexpectedly")?;

    Ok(())
}
