//! Node telemetry sources
//!
//! Both sources may be missing in a cluster (no metrics-server, kubelet
//! proxy forbidden). A missing source downgrades the affected check to
//! `unknown`; it never fails the sync.

use async_trait::async_trait;
use std::sync::Arc;

/// Live node usage from the metrics API
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUsage {
    pub memory_bytes: u64,
    pub cpu_millis: u64,
}

/// Live root filesystem usage from the kubelet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsUsage {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

/// Telemetry source could not answer
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct TelemetryUnavailable {
    pub reason: String,
}

impl TelemetryUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Provider of node CPU and memory usage
#[async_trait]
pub trait NodeMetricsProvider: Send + Sync {
    async fn node_usage(&self, node_name: &str) -> Result<NodeUsage, TelemetryUnavailable>;
}

/// Provider of node filesystem usage
#[async_trait]
pub trait FsUsageProvider: Send + Sync {
    async fn fs_usage(&self, node_name: &str) -> Result<FsUsage, TelemetryUnavailable>;
}

/// Provider used when no telemetry source is configured
#[derive(Debug, Clone, Default)]
pub struct NoTelemetry;

#[async_trait]
impl NodeMetricsProvider for NoTelemetry {
    async fn node_usage(&self, _node_name: &str) -> Result<NodeUsage, TelemetryUnavailable> {
        Err(TelemetryUnavailable::new("Metrics API not available"))
    }
}

#[async_trait]
impl FsUsageProvider for NoTelemetry {
    async fn fs_usage(&self, _node_name: &str) -> Result<FsUsage, TelemetryUnavailable> {
        Err(TelemetryUnavailable::new("Kubelet stats not available"))
    }
}

/// Telemetry sources handed to the node rules
#[derive(Clone)]
pub struct TelemetrySources {
    pub metrics: Arc<dyn NodeMetricsProvider>,
    pub fs: Arc<dyn FsUsageProvider>,
}

impl TelemetrySources {
    pub fn new(metrics: Arc<dyn NodeMetricsProvider>, fs: Arc<dyn FsUsageProvider>) -> Self {
        Self { metrics, fs }
    }

    /// Sources that always report themselves unavailable
    pub fn unavailable() -> Self {
        Self::new(Arc::new(NoTelemetry), Arc::new(NoTelemetry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_telemetry_is_unavailable() {
        let sources = TelemetrySources::unavailable();
        let err = sources.metrics.node_usage("n1").await.unwrap_err();
        assert_eq!(err.to_string(), "Metrics API not available");
        assert!(sources.fs.fs_usage("n1").await.is_err());
    }
}
