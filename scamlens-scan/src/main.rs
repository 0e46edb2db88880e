//! scamlens-scan - Risk Fusion Service
//!
//! Fuses independent scam/clone detectors (LLM visual judge, CV brand
//! matcher, ML classifier, URL heuristics, phone reputation providers) into
//! one normalized verdict per request, with graceful degradation when any
//! subset of them fails.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use scamlens_common::AppConfig;
use scamlens_scan::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "scamlens-scan", about = "scamlens risk fusion service")]
struct Args {
    /// Path to config.toml (falls back to SCAMLENS_CONFIG, then the
    /// platform config dir, then compiled defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting scamlens-scan (risk fusion service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let host = config.server.host.clone();
    let port = args.port.unwrap_or(config.server.port);

    info!(
        "Collaborators: visual_judge={}, brand_matcher={}, ml_classifier={}, reputation={:?}",
        config.providers.visual_judge.endpoint,
        config.providers.brand_matcher.endpoint,
        config.providers.ml_classifier.endpoint,
        config.providers.reputation.keys().collect::<Vec<_>>()
    );

    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on http://{host}:{port}");
    info!("Health check: http://{host}:{port}/health");

    axum::serve(listener, app).await?;

    Ok(())
}
