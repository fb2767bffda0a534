//! Per-kind synchronization plans
//!
//! Every resource kind supplies a host description, the checks it owns and
//! the results it pushes. The engine drives all kinds through [`KindPlan`]
//! so the upsert/push protocol exists once.

use crate::derive::{
    backup_verdict, deployment_verdict, node_disk_verdict, node_load_verdict, node_memory_verdict,
    pvc_verdict,
};
use crate::models::{check_types, MonitorCheck, MonitorResult};
use crate::resolver::{intervals, ResourceConfig};
use crate::state::{
    BackupScheduleState, DeploymentState, IngressState, NodeState, PvcState, ResourceMeta,
    ResourceState,
};
use crate::telemetry::TelemetrySources;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Inputs available to result computation
pub struct PlanContext<'a> {
    pub telemetry: &'a TelemetrySources,
    pub now: DateTime<Utc>,
}

/// Kind-specific part of a synchronization pass
#[async_trait]
pub trait KindPlan: Send + Sync {
    /// Human description of the host
    fn describe(&self) -> String;

    /// Check definitions owned by the resource
    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck>;

    /// Locally computed results; empty for pull-only kinds
    async fn results(&self, address: &str, ctx: &PlanContext<'_>) -> Vec<MonitorResult>;

    /// Whether results go out as one bulk request
    fn bulk_results(&self) -> bool {
        false
    }
}

impl ResourceState {
    /// Plan of the state's kind
    pub fn plan(&self) -> &dyn KindPlan {
        match self {
            ResourceState::Node(s) => s,
            ResourceState::Deployment(s) => s,
            ResourceState::Ingress(s) => s,
            ResourceState::Pvc(s) => s,
            ResourceState::BackupSchedule(s) => s,
        }
    }
}

fn qualified(meta: &ResourceMeta) -> String {
    match &meta.namespace {
        Some(ns) => format!("{}/{}", ns, meta.name),
        None => meta.name.clone(),
    }
}

#[async_trait]
impl KindPlan for NodeState {
    fn describe(&self) -> String {
        format!("Kubernetes Node {}", self.meta.name)
    }

    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck> {
        [check_types::LOAD, check_types::MEMORY, check_types::DISK]
            .into_iter()
            .map(|t| MonitorCheck::new(address, t, config.interval_or(intervals::NODE)))
            .collect()
    }

    async fn results(&self, address: &str, ctx: &PlanContext<'_>) -> Vec<MonitorResult> {
        let (usage, fs) = tokio::join!(
            ctx.telemetry.metrics.node_usage(&self.meta.name),
            ctx.telemetry.fs.fs_usage(&self.meta.name)
        );

        vec![
            MonitorResult::from_verdict(
                address,
                check_types::LOAD,
                node_load_verdict(usage.as_ref(), self.allocatable_cpu_millis),
            ),
            MonitorResult::from_verdict(
                address,
                check_types::MEMORY,
                node_memory_verdict(usage.as_ref(), self.allocatable_memory_bytes),
            ),
            MonitorResult::from_verdict(
                address,
                check_types::DISK,
                node_disk_verdict(fs.as_ref(), self.disk_pressure),
            ),
        ]
    }

    fn bulk_results(&self) -> bool {
        true
    }
}

#[async_trait]
impl KindPlan for DeploymentState {
    fn describe(&self) -> String {
        format!("Deployment {}", qualified(&self.meta))
    }

    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck> {
        vec![MonitorCheck::new(
            address,
            check_types::STATUS,
            config.interval_or(intervals::DEPLOYMENT),
        )]
    }

    async fn results(&self, address: &str, _ctx: &PlanContext<'_>) -> Vec<MonitorResult> {
        vec![MonitorResult::from_verdict(
            address,
            check_types::STATUS,
            deployment_verdict(self),
        )]
    }
}

#[async_trait]
impl KindPlan for IngressState {
    fn describe(&self) -> String {
        format!(
            "Ingress {} ({})",
            qualified(&self.meta),
            self.hosts.join(", ")
        )
    }

    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck> {
        let path = config.http_path.as_deref().unwrap_or("");
        let mut checks = Vec::new();

        for host in self.hosts.iter().filter(|h| !h.is_empty()) {
            let mut http = MonitorCheck::new(
                address,
                check_types::HTTP,
                config.interval_or(intervals::INGRESS_HTTP),
            )
            .with_config("url", format!("https://{}{}", host, path));
            if let Some(expected) = config.expected_http_status {
                http = http.with_config("expected_status", expected);
            }
            checks.push(http);

            if self.has_tls_for(host) {
                checks.push(
                    MonitorCheck::new(
                        address,
                        check_types::CERTIFICATE,
                        config.interval_or(intervals::INGRESS_CERTIFICATE),
                    )
                    .with_config("host", host.as_str())
                    .with_config("port", 443),
                );
            }

            for mount in &config.icecast_mounts {
                checks.push(
                    MonitorCheck::new(
                        address,
                        check_types::ICECAST_LISTENERS,
                        config.interval_or(intervals::INGRESS_ICECAST),
                    )
                    .with_config("url", format!("https://{}", host))
                    .with_config("mount", mount.as_str()),
                );
            }
        }

        checks
    }

    async fn results(&self, _address: &str, _ctx: &PlanContext<'_>) -> Vec<MonitorResult> {
        // pull checks only; the monitoring service runs them
        Vec::new()
    }
}

#[async_trait]
impl KindPlan for PvcState {
    fn describe(&self) -> String {
        format!(
            "PVC {} ({}, {})",
            qualified(&self.meta),
            self.requested_storage.as_deref().unwrap_or("unknown size"),
            self.storage_class.as_deref().unwrap_or("default class")
        )
    }

    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck> {
        vec![MonitorCheck::new(
            address,
            check_types::DISK,
            config.interval_or(intervals::PVC),
        )]
    }

    async fn results(&self, address: &str, _ctx: &PlanContext<'_>) -> Vec<MonitorResult> {
        vec![MonitorResult::from_verdict(
            address,
            check_types::DISK,
            pvc_verdict(self),
        )]
    }
}

#[async_trait]
impl KindPlan for BackupScheduleState {
    fn describe(&self) -> String {
        format!("K8up Schedule {}", qualified(&self.meta))
    }

    fn checks(&self, address: &str, config: &ResourceConfig) -> Vec<MonitorCheck> {
        vec![MonitorCheck::new(
            address,
            check_types::STATUS,
            config.interval_or(intervals::BACKUP_SCHEDULE),
        )]
    }

    async fn results(&self, address: &str, ctx: &PlanContext<'_>) -> Vec<MonitorResult> {
        vec![MonitorResult::from_verdict(
            address,
            check_types::STATUS,
            backup_verdict(&self.backups, ctx.now),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceIdentity, ResourceKind};
    use crate::resolver::annotations;
    use crate::state::IngressTls;

    fn ingress(hosts: &[&str], tls_hosts: &[&str]) -> IngressState {
        IngressState {
            meta: ResourceMeta::new("site", Some("web")).with_annotation(annotations::ENABLED, "true"),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            tls: if tls_hosts.is_empty() {
                Vec::new()
            } else {
                vec![IngressTls {
                    hosts: tls_hosts.iter().map(|h| h.to_string()).collect(),
                }]
            },
        }
    }

    fn resolve(state: &IngressState) -> (String, ResourceConfig) {
        let identity = ResourceIdentity::new("prod", ResourceKind::Ingress, Some("web"), "site");
        ResourceConfig::resolve(&identity, state.meta.annotations.as_ref())
    }

    #[test]
    fn test_ingress_single_host_without_tls() {
        let state = ingress(&["a.example.com"], &[]);
        let (address, config) = resolve(&state);
        let checks = state.checks(&address, &config);

        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].check_type, check_types::HTTP);
        assert_eq!(checks[0].config["url"], "https://a.example.com");
        assert_eq!(checks[0].interval_seconds, intervals::INGRESS_HTTP);
        assert!(!checks[0].config.contains_key("expected_status"));
    }

    #[test]
    fn test_ingress_tls_adds_certificate_check() {
        let state = ingress(&["a.example.com", "b.example.com"], &["b.example.com"]);
        let (address, config) = resolve(&state);
        let checks = state.checks(&address, &config);

        let types: Vec<&str> = checks.iter().map(|c| c.check_type.as_str()).collect();
        assert_eq!(types, vec!["http", "http", "certificate"]);
        assert_eq!(checks[2].config["host"], "b.example.com");
        assert_eq!(checks[2].config["port"], 443);
        assert_eq!(checks[2].interval_seconds, intervals::INGRESS_CERTIFICATE);
    }

    #[test]
    fn test_ingress_path_status_and_mounts() {
        let mut state = ingress(&["radio.example.com"], &[]);
        state.meta = state
            .meta
            .with_annotation(annotations::HTTP_PATH, "status/")
            .with_annotation(annotations::EXPECTED_STATUS, "204")
            .with_annotation(annotations::ICECAST_MOUNTS, "/live,/hq");
        let (address, config) = resolve(&state);
        let checks = state.checks(&address, &config);

        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].config["url"], "https://radio.example.com/status");
        assert_eq!(checks[0].config["expected_status"], 204);
        assert_eq!(checks[1].check_type, check_types::ICECAST_LISTENERS);
        assert_eq!(checks[1].config["mount"], "/live");
        assert_eq!(checks[2].config["mount"], "/hq");
        assert_eq!(checks[2].config["url"], "https://radio.example.com");
    }

    #[test]
    fn test_ingress_description_lists_hosts() {
        let state = ingress(&["a.example.com", "b.example.com"], &[]);
        assert_eq!(
            state.describe(),
            "Ingress web/site (a.example.com, b.example.com)"
        );
    }

    #[test]
    fn test_node_checks_share_interval() {
        let node = NodeState {
            meta: ResourceMeta::new("worker-1", None).with_annotation(annotations::INTERVAL, "120"),
            ..Default::default()
        };
        let identity = ResourceIdentity::new("prod", ResourceKind::Node, None, "worker-1");
        let (address, config) = ResourceConfig::resolve(&identity, node.meta.annotations.as_ref());
        let checks = node.checks(&address, &config);

        let types: Vec<&str> = checks.iter().map(|c| c.check_type.as_str()).collect();
        assert_eq!(types, vec!["load", "memory", "disk"]);
        assert!(checks.iter().all(|c| c.interval_seconds == 120));
        assert!(node.bulk_results());
    }

    #[test]
    fn test_pvc_description() {
        let pvc = PvcState {
            meta: ResourceMeta::new("data", Some("db")),
            requested_storage: Some("10Gi".to_string()),
            storage_class: Some("standard".to_string()),
            ..Default::default()
        };
        assert_eq!(pvc.describe(), "PVC db/data (10Gi, standard)");
    }
}
