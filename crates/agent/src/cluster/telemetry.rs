//! Node telemetry from the metrics API and the kubelet stats summary

use super::resources::node_metrics;
use agent_lib::quantity::{parse_bytes, parse_millicores};
use agent_lib::telemetry::{
    FsUsage, FsUsageProvider, NodeMetricsProvider, NodeUsage, TelemetryUnavailable,
};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GetParams};
use kube::core::Request;
use kube::Client;
use serde::Deserialize;
use tracing::debug;

/// Reads node usage through the API server
#[derive(Clone)]
pub struct KubeTelemetry {
    client: Client,
}

impl KubeTelemetry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeMetricsProvider for KubeTelemetry {
    async fn node_usage(&self, node_name: &str) -> Result<NodeUsage, TelemetryUnavailable> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &node_metrics());
        let metrics = api.get(node_name).await.map_err(|e| {
            debug!(node = %node_name, error = %e, "Metrics API request failed");
            TelemetryUnavailable::new("Metrics API not available")
        })?;
        usage_from_metrics(&metrics.data)
    }
}

fn usage_from_metrics(data: &serde_json::Value) -> Result<NodeUsage, TelemetryUnavailable> {
    let usage = |key: &str| {
        data.get("usage")
            .and_then(|u| u.get(key))
            .and_then(|v| v.as_str())
    };

    match (
        usage("memory").and_then(parse_bytes),
        usage("cpu").and_then(parse_millicores),
    ) {
        (Some(memory_bytes), Some(cpu_millis)) => Ok(NodeUsage {
            memory_bytes,
            cpu_millis,
        }),
        _ => Err(TelemetryUnavailable::new("Metrics API returned no usage")),
    }
}

#[derive(Debug, Deserialize)]
struct StatsSummary {
    node: NodeStats,
}

#[derive(Debug, Deserialize)]
struct NodeStats {
    fs: Option<FsStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsStats {
    available_bytes: Option<u64>,
    capacity_bytes: Option<u64>,
}

#[async_trait]
impl FsUsageProvider for KubeTelemetry {
    async fn fs_usage(&self, node_name: &str) -> Result<FsUsage, TelemetryUnavailable> {
        let request = Request::new(format!("/api/v1/nodes/{}/proxy/stats", node_name))
            .get("summary", &GetParams::default())
            .map_err(|e| TelemetryUnavailable::new(format!("Kubelet stats unavailable: {}", e)))?;
        let body = self
            .client
            .request_text(request)
            .await
            .map_err(|e| TelemetryUnavailable::new(format!("Kubelet stats unavailable: {}", e)))?;
        fs_from_summary(&body)
    }
}

fn fs_from_summary(body: &str) -> Result<FsUsage, TelemetryUnavailable> {
    let summary: StatsSummary = serde_json::from_str(body)
        .map_err(|e| TelemetryUnavailable::new(format!("Failed to parse kubelet stats: {}", e)))?;

    match summary.node.fs {
        Some(FsStats {
            available_bytes: Some(available),
            capacity_bytes: Some(capacity),
        }) if capacity > 0 => Ok(FsUsage {
            used_bytes: capacity.saturating_sub(available),
            capacity_bytes: capacity,
        }),
        _ => Err(TelemetryUnavailable::new("No filesystem data in kubelet stats")),
    }
}
