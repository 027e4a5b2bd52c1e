//! Ingestion gateway entrypoint (HTTP).
//!
//! Serves `/ingest` and friends on `HOST:PORT`; `--host` and `--port` override the environment.
use anyhow::{Context, Result};
use clap::Parser;
use pdfvec::{
    api,
    config,
    ingestion::IngestionService,
    logging::{self, LevelPolicy},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "pdfvec-ingest", about = "PDF ingestion gateway", version)]
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
        "ingestion-service",
        &config.log_level,
        config.environment,
        LevelPolicy::QuietInProduction,
    );

    let service = IngestionService::new(config).context("failed to initialize ingestion service")?;
    let app = api::apply_middleware(api::create_ingest_router(Arc::new(service)), config);

    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    tracing::info!(host = %host, port, environment = config.environment.as_str(), "Starting Ingestion Service");
    tracing::info!("Available endpoints:");
    tracing::info!("  - GET  /health - Health check");
    tracing::info!("  - POST /ingest - Start PDF ingestion");
    tracing::info!("  - GET  /ingest/status/{{task_id}} - Check task status");
    tracing::info!("  - GET  /metrics - Ingestion counters");
    tracing::info!("  - GET  / - Service information");

    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .context("ingestion server terminated unexpectedly")?;

    Ok(())
}
