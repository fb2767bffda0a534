//! Core data models for the synchronization engine
//!
//! The monitor types serialize with the exact field names the push API
//! expects, so they double as wire payloads.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of cluster resource mirrored into the monitoring service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Node,
    Deployment,
    Ingress,
    Pvc,
    BackupSchedule,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Node,
        ResourceKind::Deployment,
        ResourceKind::Ingress,
        ResourceKind::Pvc,
        ResourceKind::BackupSchedule,
    ];

    /// Wire name used in addresses, topics and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Node => "node",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Ingress => "ingress",
            ResourceKind::Pvc => "pvc",
            ResourceKind::BackupSchedule => "backup-schedule",
        }
    }

    /// Cluster-scoped kinds never carry a namespace
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, ResourceKind::Node)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a tracked resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub cluster: String,
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceIdentity {
    /// Build an identity, dropping the namespace for cluster-scoped kinds
    /// and normalizing an empty namespace to `None`.
    pub fn new(
        cluster: impl Into<String>,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        let namespace = if kind.is_cluster_scoped() {
            None
        } else {
            namespace.filter(|ns| !ns.is_empty()).map(str::to_string)
        };

        Self {
            cluster: cluster.into(),
            kind,
            namespace,
            name: name.into(),
        }
    }

    /// Stable monitoring address: `k8s://<cluster>/<kind>[/<namespace>]/<name>`
    pub fn address(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("k8s://{}/{}/{}/{}", self.cluster, self.kind, ns, self.name),
            None => format!("k8s://{}/{}/{}", self.cluster, self.kind, self.name),
        }
    }

    /// Default topic: `Kubernetes/<cluster>/<kind>[/<namespace>]`
    pub fn default_topic(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("Kubernetes/{}/{}/{}", self.cluster, self.kind, ns),
            None => format!("Kubernetes/{}/{}", self.cluster, self.kind),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Severity of a check result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warning => "warning",
            CheckStatus::Critical => "critical",
            CheckStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a status derivation rule
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: CheckStatus,
    pub message: String,
    pub value: Option<f64>,
}

impl Verdict {
    pub fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Verdict for a check whose telemetry source is missing
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Unknown, message)
    }
}

/// The push API stores booleans as 0/1 integers
fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

/// Monitored target, keyed by address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorHost {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(serialize_with = "serialize_flag")]
    pub enabled: bool,
}

/// Check-type specific configuration map
pub type CheckConfig = BTreeMap<String, serde_json::Value>;

/// Health probe definition, keyed by `(host_address, type)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorCheck {
    pub host_address: String,
    #[serde(rename = "type")]
    pub check_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: CheckConfig,
    pub interval_seconds: u32,
    #[serde(serialize_with = "serialize_flag")]
    pub enabled: bool,
}

impl MonitorCheck {
    pub fn new(host_address: &str, check_type: &str, interval_seconds: u32) -> Self {
        Self {
            host_address: host_address.to_string(),
            check_type: check_type.to_string(),
            config: CheckConfig::new(),
            interval_seconds,
            enabled: true,
        }
    }

    pub fn with_config(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }
}

/// One observation of a check, computed locally and pushed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorResult {
    pub host_address: String,
    pub check_type: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl MonitorResult {
    pub fn from_verdict(host_address: &str, check_type: &str, verdict: Verdict) -> Self {
        Self {
            host_address: host_address.to_string(),
            check_type: check_type.to_string(),
            status: verdict.status,
            value: verdict.value,
            message: verdict.message,
        }
    }
}

/// Well-known check type names
pub mod check_types {
    pub const LOAD: &str = "load";
    pub const MEMORY: &str = "memory";
    pub const DISK: &str = "disk";
    pub const STATUS: &str = "status";
    pub const HTTP: &str = "http";
    pub const CERTIFICATE: &str = "certificate";
    pub const ICECAST_LISTENERS: &str = "icecast_listeners";
}
