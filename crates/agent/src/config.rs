//! Agent configuration

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Smallest accepted resync interval
const MIN_RESYNC_INTERVAL_SECS: u64 = 30;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Push API base URL (`TINYMON_URL`)
    #[serde(rename = "tinymon_url", default)]
    pub push_url: String,

    /// Bearer credential for the push API (`TINYMON_API_KEY`)
    #[serde(rename = "tinymon_api_key", default)]
    pub api_key: String,

    /// Cluster name used in addresses and topics (`CLUSTER_NAME`)
    #[serde(default)]
    pub cluster_name: String,

    /// API server port for health/metrics
    #[serde(rename = "agent_api_port", default = "default_api_port")]
    pub api_port: u16,

    /// Interval between full resyncs in seconds
    #[serde(
        rename = "agent_resync_interval_secs",
        default = "default_resync_interval"
    )]
    pub resync_interval_secs: u64,

    /// Per-call push API timeout in seconds
    #[serde(
        rename = "agent_request_timeout_secs",
        default = "default_request_timeout"
    )]
    pub request_timeout_secs: u64,

    /// Attempts per push API call, including the first
    #[serde(rename = "agent_retry_attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Watch K8up backup schedules
    #[serde(rename = "agent_enable_backups", default = "default_enable_backups")]
    pub enable_backups: bool,
}

fn default_api_port() -> u16 {
    8081
}

fn default_resync_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_enable_backups() -> bool {
    true
}

impl AgentConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Load configuration from an explicit variable map, or the process
    /// environment when `vars` is `None`
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::default().source(vars))
            .build()
            .context("Failed to read configuration")?;

        let config: AgentConfig = config
            .try_deserialize()
            .context("Invalid agent configuration")?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self> {
        for (var, value) in [
            ("TINYMON_URL", &self.push_url),
            ("TINYMON_API_KEY", &self.api_key),
            ("CLUSTER_NAME", &self.cluster_name),
        ] {
            if value.trim().is_empty() {
                bail!("{} must be set", var);
            }
        }

        self.resync_interval_secs = self.resync_interval_secs.max(MIN_RESYNC_INTERVAL_SECS);
        self.retry_attempts = self.retry_attempts.max(1);
        Ok(self)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
