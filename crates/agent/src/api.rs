//! Health, readiness and metrics endpoints of the agent

use agent_lib::{
    health::{ComponentStatus, HealthRegistry, HealthResponse},
    observability::SyncMetrics,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// State shared by the endpoint handlers
pub struct ApiState {
    cluster: String,
    health: HealthRegistry,
    metrics: SyncMetrics,
}

impl ApiState {
    pub fn new(cluster: impl Into<String>, health: HealthRegistry, metrics: SyncMetrics) -> Self {
        Self {
            cluster: cluster.into(),
            health,
            metrics,
        }
    }
}

/// Component health tagged with the cluster this agent mirrors
#[derive(Serialize)]
struct ClusterHealth<'a> {
    cluster: &'a str,
    #[serde(flatten)]
    health: HealthResponse,
}

/// Degraded push API or watchers still serve traffic
fn health_status(status: ComponentStatus) -> StatusCode {
    match status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn healthz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let health = state.health.health().await;
    let status = health_status(health.status);
    let body = ClusterHealth {
        cluster: &state.cluster,
        health,
    };
    (status, Json(body)).into_response()
}

async fn readyz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;
    let status = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(readiness))
}

async fn metrics(State(state): State<Arc<ApiState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the endpoints on all interfaces until the task is aborted
pub async fn serve(port: u16, state: Arc<ApiState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, cluster = %state.cluster, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
