//! Observability infrastructure for the synchronization agent
//!
//! Provides:
//! - Prometheus metrics (sync passes, push errors, check failures, pass latency)
//! - Structured JSON logging with tracing

use crate::models::ResourceKind;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for sync pass duration (in seconds)
const PASS_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SyncMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct SyncMetricsInner {
    sync_passes: IntCounterVec,
    sync_duration_seconds: HistogramVec,
    push_errors: IntCounterVec,
    check_upsert_failures: IntCounterVec,
    hosts_removed: IntCounterVec,
}

impl SyncMetricsInner {
    fn new() -> Self {
        Self {
            sync_passes: register_int_counter_vec!(
                "tinymon_sync_passes_total",
                "Synchronization passes by resource kind and outcome",
                &["kind", "outcome"]
            )
            .expect("Failed to register sync_passes_total"),

            sync_duration_seconds: register_histogram_vec!(
                "tinymon_sync_duration_seconds",
                "Wall time of one synchronization pass",
                &["kind"],
                PASS_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register sync_duration_seconds"),

            push_errors: register_int_counter_vec!(
                "tinymon_push_errors_total",
                "Failed push API calls by operation",
                &["operation"]
            )
            .expect("Failed to register push_errors_total"),

            check_upsert_failures: register_int_counter_vec!(
                "tinymon_check_upsert_failures_total",
                "Check upserts that failed without aborting the pass",
                &["kind"]
            )
            .expect("Failed to register check_upsert_failures_total"),

            hosts_removed: register_int_counter_vec!(
                "tinymon_hosts_removed_total",
                "Hosts removed because the resource was deleted or disabled",
                &["kind"]
            )
            .expect("Failed to register hosts_removed_total"),
        }
    }
}

/// Outcome label of a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Synced,
    Removed,
    Failed,
}

impl PassOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            PassOutcome::Synced => "synced",
            PassOutcome::Removed => "removed",
            PassOutcome::Failed => "failed",
        }
    }
}

/// Sync metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SyncMetrics {
    _private: (),
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SyncMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SyncMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a finished pass and its duration
    pub fn observe_pass(&self, kind: ResourceKind, outcome: PassOutcome, duration_secs: f64) {
        let inner = self.inner();
        inner
            .sync_passes
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .inc();
        inner
            .sync_duration_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_push_errors(&self, operation: &str) {
        self.inner().push_errors.with_label_values(&[operation]).inc();
    }

    pub fn inc_check_upsert_failures(&self, kind: ResourceKind) {
        self.inner()
            .check_upsert_failures
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_hosts_removed(&self, kind: ResourceKind) {
        self.inner()
            .hosts_removed
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Text exposition of the registry holding the sync metrics
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&prometheus::gather())
    }

    /// Number of passes recorded for a kind and outcome
    pub fn passes(&self, kind: ResourceKind, outcome: PassOutcome) -> u64 {
        self.inner()
            .sync_passes
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .get()
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for sync passes and
/// agent lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// Log a completed present-state pass
    pub fn log_synced(
        &self,
        address: &str,
        kind: ResourceKind,
        checks_upserted: usize,
        check_failures: usize,
        results_pushed: usize,
    ) {
        if check_failures > 0 {
            warn!(
                event = "resource_synced",
                cluster = %self.cluster,
                address = %address,
                kind = %kind,
                checks_upserted = checks_upserted,
                check_failures = check_failures,
                results_pushed = results_pushed,
                "Resource synced with failed checks"
            );
        } else {
            info!(
                event = "resource_synced",
                cluster = %self.cluster,
                address = %address,
                kind = %kind,
                checks_upserted = checks_upserted,
                results_pushed = results_pushed,
                "Resource synced"
            );
        }
    }

    /// Log a host removal
    pub fn log_removed(&self, address: &str, kind: ResourceKind, deleted: bool) {
        info!(
            event = "host_removed",
            cluster = %self.cluster,
            address = %address,
            kind = %kind,
            reason = if deleted { "deleted" } else { "disabled" },
            "Removed host from monitoring"
        );
    }

    /// Log an abandoned pass
    pub fn log_sync_failed(&self, address: &str, kind: ResourceKind, error: &dyn std::error::Error) {
        warn!(
            event = "sync_failed",
            cluster = %self.cluster,
            address = %address,
            kind = %kind,
            error = %error,
            "Sync pass abandoned, will retry on next trigger"
        );
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, push_url: &str) {
        info!(
            event = "agent_started",
            cluster = %self.cluster,
            agent_version = %version,
            push_url = %push_url,
            "TinyMon agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "TinyMon agent shutting down"
        );
    }
}
