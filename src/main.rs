//! Fraud Threshold Service - Main Entry Point
//!
//! Loads the threshold and model artifacts once, then serves decisions over
//! HTTP. Any artifact failure aborts startup.

use anyhow::{Context, Result};
use fraud_threshold_service::{
    artifacts::{ArtifactStore, HttpArtifactStore, LocalArtifactStore},
    config::{AppConfig, StoreKind},
    logging,
    metrics::{MetricsReporter, ServiceMetrics},
    server::{self, AppState},
    DecisionService,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging, "fraud_threshold_service")?;

    info!("Starting Fraud Threshold Service");
    info!(
        store = ?config.artifacts.store,
        bucket = %config.artifacts.bucket,
        prefix = %config.artifacts.prefix,
        model_format = ?config.artifacts.model_format,
        expected_features = config.scoring.expected_features,
        "Configuration loaded"
    );

    let store: Arc<dyn ArtifactStore> = match config.artifacts.store {
        StoreKind::Local => Arc::new(LocalArtifactStore::new(&config.artifacts.root)),
        StoreKind::Http => Arc::new(HttpArtifactStore::new(&config.artifacts.root)),
    };

    let service = match DecisionService::load(store, &config).await {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!(error = %e, unreachable = e.is_unreachable(), "Failed to load artifacts, aborting startup");
            return Err(e).context("Artifact loading failed");
        }
    };

    let metrics = Arc::new(ServiceMetrics::new());
    if config.server.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.server.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(
        service,
        metrics.clone(),
        &config.server.api_key,
        &config.artifacts.bucket,
        &config.artifacts.prefix,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    server::serve(listener, state, shutdown_signal()).await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
