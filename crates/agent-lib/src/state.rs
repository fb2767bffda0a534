//! Typed resource state consumed by the synchronization engine
//!
//! States are produced by a [`StateProvider`]; the engine never talks to
//! the cluster itself.

use crate::models::ResourceKind;
use crate::resolver::Annotations;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Metadata shared by every resource kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMeta {
    pub name: String,
    pub namespace: Option<String>,
    pub annotations: Option<Annotations>,
}

impl ResourceMeta {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            annotations: None,
        }
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations
            .get_or_insert_with(Annotations::new)
            .insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    pub meta: ResourceMeta,
    pub allocatable_memory_bytes: Option<u64>,
    pub allocatable_cpu_millis: Option<u64>,
    /// `DiskPressure` condition; `None` when the condition is absent
    pub disk_pressure: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentState {
    pub meta: ResourceMeta,
    /// `spec.replicas`; unset means 1
    pub desired_replicas: Option<i32>,
    pub ready_replicas: i32,
    pub available_replicas: i32,
}

/// TLS block of an ingress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressTls {
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressState {
    pub meta: ResourceMeta,
    /// Rule hosts in declaration order
    pub hosts: Vec<String>,
    pub tls: Vec<IngressTls>,
}

impl IngressState {
    /// Whether any TLS block covers the given host
    pub fn has_tls_for(&self, host: &str) -> bool {
        self.tls.iter().any(|t| t.hosts.iter().any(|h| h == host))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PvcState {
    pub meta: ResourceMeta,
    /// `status.phase` as reported (`Bound`, `Pending`, `Lost`, ...)
    pub phase: Option<String>,
    /// Requested storage as written on the claim, e.g. `10Gi`
    pub requested_storage: Option<String>,
    pub requested_bytes: Option<u64>,
    pub storage_class: Option<String>,
}

/// Terminal condition of a backup run
#[derive(Debug, Clone, PartialEq)]
pub struct BackupCondition {
    pub condition_type: String,
    pub status: String,
    pub message: String,
}

impl BackupCondition {
    pub fn new(condition_type: &str, status: &str, message: &str) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: status.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_true(&self, condition_type: &str) -> bool {
        self.condition_type == condition_type && self.status == "True"
    }
}

/// One backup object belonging to a schedule's namespace
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub conditions: Vec<BackupCondition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupScheduleState {
    pub meta: ResourceMeta,
    pub backups: Vec<BackupRecord>,
}

/// Current state of any tracked resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState {
    Node(NodeState),
    Deployment(DeploymentState),
    Ingress(IngressState),
    Pvc(PvcState),
    BackupSchedule(BackupScheduleState),
}

impl ResourceState {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceState::Node(_) => ResourceKind::Node,
            ResourceState::Deployment(_) => ResourceKind::Deployment,
            ResourceState::Ingress(_) => ResourceKind::Ingress,
            ResourceState::Pvc(_) => ResourceKind::Pvc,
            ResourceState::BackupSchedule(_) => ResourceKind::BackupSchedule,
        }
    }

    pub fn meta(&self) -> &ResourceMeta {
        match self {
            ResourceState::Node(s) => &s.meta,
            ResourceState::Deployment(s) => &s.meta,
            ResourceState::Ingress(s) => &s.meta,
            ResourceState::Pvc(s) => &s.meta,
            ResourceState::BackupSchedule(s) => &s.meta,
        }
    }
}

/// Failure to read resource state (distinct from "not found")
#[derive(Debug, thiserror::Error)]
#[error("failed to read {kind} {name}: {reason}")]
pub struct ProviderError {
    pub kind: ResourceKind,
    pub name: String,
    pub reason: String,
}

/// Source of live resource state
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Fetch the current state; `Ok(None)` means the resource no longer exists
    async fn fetch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<ResourceState>, ProviderError>;
}
