//! Annotation-driven per-resource configuration
//!
//! Annotations are parsed once into a typed [`ResourceConfig`]. Malformed
//! values never fail a sync: every field falls back to its default.

use crate::models::{ResourceIdentity, ResourceKind};
use std::collections::BTreeMap;

/// Annotation keys understood by the agent
pub mod annotations {
    pub const ENABLED: &str = "tinymon.io/enabled";
    pub const NAME: &str = "tinymon.io/name";
    pub const TOPIC: &str = "tinymon.io/topic";
    pub const INTERVAL: &str = "tinymon.io/interval";
    pub const EXPECTED_STATUS: &str = "tinymon.io/expected-status";
    pub const HTTP_PATH: &str = "tinymon.io/http-path";
    pub const ICECAST_MOUNTS: &str = "tinymon.io/icecast-mounts";
}

/// Smallest accepted check interval in seconds
pub const MIN_INTERVAL_SECS: u32 = 30;

/// Default check intervals per check family
pub mod intervals {
    pub const NODE: u32 = 60;
    pub const DEPLOYMENT: u32 = 60;
    pub const PVC: u32 = 60;
    pub const BACKUP_SCHEDULE: u32 = 60;
    pub const INGRESS_HTTP: u32 = 300;
    pub const INGRESS_CERTIFICATE: u32 = 3600;
    pub const INGRESS_ICECAST: u32 = 60;
}

/// Raw annotation map as read from resource metadata
pub type Annotations = BTreeMap<String, String>;

/// Default interval of the primary check of a kind
pub fn kind_default_interval(kind: ResourceKind) -> u32 {
    match kind {
        ResourceKind::Node => intervals::NODE,
        ResourceKind::Deployment => intervals::DEPLOYMENT,
        ResourceKind::Ingress => intervals::INGRESS_HTTP,
        ResourceKind::Pvc => intervals::PVC,
        ResourceKind::BackupSchedule => intervals::BACKUP_SCHEDULE,
    }
}

/// Resolved per-resource settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub enabled: bool,
    pub display_name: String,
    pub topic: String,
    pub check_interval_seconds: u32,
    /// Interval from the annotation, if it was valid
    pub interval_override: Option<u32>,
    pub expected_http_status: Option<u16>,
    pub http_path: Option<String>,
    pub icecast_mounts: Vec<String>,
}

impl ResourceConfig {
    /// Resolve the address and configuration of a resource from its annotations
    pub fn resolve(
        identity: &ResourceIdentity,
        annotations: Option<&Annotations>,
    ) -> (String, ResourceConfig) {
        let get = |key: &str| annotations.and_then(|a| a.get(key)).map(String::as_str);

        let interval_override = get(annotations::INTERVAL).and_then(parse_interval);
        let config = ResourceConfig {
            enabled: is_enabled(annotations),
            display_name: get(annotations::NAME)
                .filter(|n| !n.is_empty())
                .unwrap_or(identity.name.as_str())
                .to_string(),
            topic: get(annotations::TOPIC)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| identity.default_topic()),
            check_interval_seconds: interval_override
                .unwrap_or_else(|| kind_default_interval(identity.kind)),
            interval_override,
            expected_http_status: get(annotations::EXPECTED_STATUS).and_then(parse_http_status),
            http_path: get(annotations::HTTP_PATH).and_then(canonical_http_path),
            icecast_mounts: get(annotations::ICECAST_MOUNTS)
                .map(split_mounts)
                .unwrap_or_default(),
        };

        (identity.address(), config)
    }

    /// Interval for a check whose family default differs from the kind default
    pub fn interval_or(&self, default: u32) -> u32 {
        self.interval_override.unwrap_or(default)
    }
}

/// Only the literal `"true"` enables a resource
pub fn is_enabled(annotations: Option<&Annotations>) -> bool {
    annotations
        .and_then(|a| a.get(annotations::ENABLED))
        .is_some_and(|v| v == "true")
}

/// Interval annotation with the kind default as fallback
pub fn check_interval(annotations: Option<&Annotations>, kind_default: u32) -> u32 {
    annotations
        .and_then(|a| a.get(annotations::INTERVAL))
        .and_then(|v| parse_interval(v))
        .unwrap_or(kind_default)
}

/// Plain decimal integers only; values past `u32::MAX` saturate
fn parse_interval(raw: &str) -> Option<u32> {
    raw.parse::<u64>()
        .ok()
        .filter(|secs| *secs >= u64::from(MIN_INTERVAL_SECS))
        .map(|secs| u32::try_from(secs).unwrap_or(u32::MAX))
}

fn parse_http_status(raw: &str) -> Option<u16> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|code| (100..600).contains(code))
}

/// `"health/"` becomes `"/health"`; empty or `"/"` means no suffix
fn canonical_http_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}

fn split_mounts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
