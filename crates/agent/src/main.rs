//! TinyMon Agent - Kubernetes to TinyMon synchronization agent
//!
//! This binary runs as a single Deployment per cluster, watching opted-in
//! resources and pushing hosts, checks and results to a TinyMon instance.

use agent_lib::{
    health::HealthRegistry,
    models::ResourceKind,
    observability::{StructuredLogger, SyncMetrics},
    push::{PushClientBuilder, RetryPolicy},
    sync::SyncEngine,
    telemetry::TelemetrySources,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod cluster;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const RETRY_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting tinymon-agent");

    let config = config::AgentConfig::load()?;
    info!(
        cluster = %config.cluster_name,
        resync_interval_secs = config.resync_interval_secs,
        "Agent configured"
    );

    let kinds: Vec<ResourceKind> = ResourceKind::ALL
        .into_iter()
        .filter(|kind| config.enable_backups || *kind != ResourceKind::BackupSchedule)
        .collect();

    let health_registry = HealthRegistry::new();
    health_registry.register_agent(&kinds).await;

    let metrics = SyncMetrics::new();
    let logger = StructuredLogger::new(&config.cluster_name);
    logger.log_startup(AGENT_VERSION, &config.push_url);

    let push = PushClientBuilder::new()
        .base_url(&config.push_url)
        .api_key(&config.api_key)
        .request_timeout(config.request_timeout())
        .retry(RetryPolicy::exponential(
            config.retry_attempts,
            RETRY_INITIAL_BACKOFF,
            RETRY_MAX_BACKOFF,
        ))
        .build()
        .context("Failed to create push client")?;

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let telemetry = Arc::new(cluster::KubeTelemetry::new(client.clone()));
    let engine = SyncEngine::new(Arc::new(push), &config.cluster_name)
        .with_telemetry(TelemetrySources::new(telemetry.clone(), telemetry));
    let syncer = Arc::new(cluster::Syncer::new(
        engine,
        cluster::KubeStateProvider::new(client.clone()),
        health_registry.clone(),
    ));

    let api_state = Arc::new(api::ApiState::new(
        &config.cluster_name,
        health_registry.clone(),
        metrics,
    ));

    // Start health and metrics server
    let api_handle = tokio::spawn(api::serve(config.api_port, api_state));

    let mut handles = Vec::new();
    for kind in &kinds {
        handles.extend(cluster::spawn_kind(
            client.clone(),
            Arc::clone(&syncer),
            *kind,
            config.resync_interval(),
        ));
    }

    // Mark agent as ready once every watcher is running
    health_registry.set_ready(true).await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    logger.log_shutdown("SIGINT received");

    for handle in handles {
        handle.abort();
    }
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
