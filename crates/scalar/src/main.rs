//! Scalar - HorizontalPodAutoscaler controller
//!
//! Watches labelled Deployments and ReplicationControllers and keeps one
//! autoscaler per workload, deleting it when the workload goes away.

use anyhow::{Context, Result};
use scalar_lib::{
    api::{self, AppState},
    health::HealthRegistry,
    KubeOrchestrator, ReconcilerBuilder, ScalarMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting scalar");

    let config = config::ScalarConfig::load()?;
    if !config.selector.is_empty() {
        info!(selector = %config.selector, "Using selector");
    }

    let orchestrator = KubeOrchestrator::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let health_registry = HealthRegistry::new();
    let metrics = ScalarMetrics::new();
    let logger = StructuredLogger::new(&config.selector);

    let app_state = Arc::new(AppState::new(health_registry.clone(), metrics));
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server stopped");
        }
    });

    let mut reconciler = ReconcilerBuilder::new(Arc::new(orchestrator))
        .config(config.reconciler_config())
        .health(health_registry)
        .build();

    tokio::select! {
        result = reconciler.run() => {
            result.context("Reconciler stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    Ok(())
}
