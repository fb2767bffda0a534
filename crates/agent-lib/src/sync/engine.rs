//! Synchronization engine
//!
//! Converges the monitoring service towards the current state of one
//! resource. A pass is stateless: the desired host, checks and results are
//! recomputed from scratch and written with idempotent upserts.

use super::plan::PlanContext;
use crate::models::{MonitorHost, ResourceIdentity, ResourceKind};
use crate::observability::{PassOutcome, StructuredLogger, SyncMetrics};
use crate::push::{Operation, PushApi, PushError};
use crate::resolver::{is_enabled, ResourceConfig};
use crate::state::{ProviderError, ResourceState, StateProvider};
use crate::telemetry::TelemetrySources;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn, Instrument};

/// Result of a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Host deleted because the resource is gone or disabled
    Removed,
    /// Host, checks and results written
    Synced {
        checks_upserted: usize,
        check_failures: usize,
        results_pushed: usize,
    },
}

/// A pass that was abandoned; the next trigger retries it
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to remove host {address}: {source}")]
    RemoveHost {
        address: String,
        #[source]
        source: PushError,
    },

    #[error("failed to upsert host {address}: {source}")]
    UpsertHost {
        address: String,
        #[source]
        source: PushError,
    },

    #[error("failed to push results for {address}: {source}")]
    PushResults {
        address: String,
        #[source]
        source: PushError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{name}: expected {expected} state, got {actual}")]
    KindMismatch {
        name: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },
}

impl SyncError {
    fn push_error(&self) -> Option<&PushError> {
        match self {
            SyncError::RemoveHost { source, .. }
            | SyncError::UpsertHost { source, .. }
            | SyncError::PushResults { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Drives synchronization passes against a push API
#[derive(Clone)]
pub struct SyncEngine {
    push: Arc<dyn PushApi>,
    cluster: String,
    telemetry: TelemetrySources,
    metrics: SyncMetrics,
    logger: StructuredLogger,
}

impl SyncEngine {
    pub fn new(push: Arc<dyn PushApi>, cluster: impl Into<String>) -> Self {
        let cluster = cluster.into();
        Self {
            push,
            logger: StructuredLogger::new(&cluster),
            cluster,
            telemetry: TelemetrySources::unavailable(),
            metrics: SyncMetrics::new(),
        }
    }

    /// Use the given node telemetry sources
    pub fn with_telemetry(mut self, telemetry: TelemetrySources) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Identity of a resource in this engine's cluster
    pub fn identity(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> ResourceIdentity {
        ResourceIdentity::new(&self.cluster, kind, namespace, name)
    }

    /// Fetch the resource from `provider` and sync it
    ///
    /// A read failure abandons the pass without touching the remote side.
    pub async fn reconcile(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        provider: &dyn StateProvider,
    ) -> Result<SyncOutcome, SyncError> {
        let state = provider.fetch(kind, namespace, name).await?;
        self.sync(kind, namespace, name, state.as_ref()).await
    }

    /// Sync one resource; `None` means it no longer exists
    pub async fn sync(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        state: Option<&ResourceState>,
    ) -> Result<SyncOutcome, SyncError> {
        self.sync_at(kind, namespace, name, state, Utc::now()).await
    }

    /// Sync with an explicit clock for age-based rules
    pub async fn sync_at(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        state: Option<&ResourceState>,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let identity = self.identity(kind, namespace, name);
        let address = identity.address();
        let span = tracing::info_span!("sync", kind = %kind, address = %address);

        let started = Instant::now();
        let result = self
            .run_pass(&identity, &address, state, now)
            .instrument(span)
            .await;

        let outcome = match &result {
            Ok(SyncOutcome::Removed) => PassOutcome::Removed,
            Ok(SyncOutcome::Synced { .. }) => PassOutcome::Synced,
            Err(e) => {
                if let Some(op) = e.push_error().and_then(PushError::operation) {
                    self.metrics.inc_push_errors(op.label());
                }
                self.logger.log_sync_failed(&address, kind, e);
                PassOutcome::Failed
            }
        };
        self.metrics
            .observe_pass(kind, outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn run_pass(
        &self,
        identity: &ResourceIdentity,
        address: &str,
        state: Option<&ResourceState>,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let state = match state {
            Some(state) if state.kind() != identity.kind => {
                return Err(SyncError::KindMismatch {
                    name: identity.name.clone(),
                    expected: identity.kind,
                    actual: state.kind(),
                });
            }
            Some(state) if is_enabled(state.meta().annotations.as_ref()) => state,
            other => return self.remove(identity.kind, address, other.is_none()).await,
        };

        let (_, config) = ResourceConfig::resolve(identity, state.meta().annotations.as_ref());
        let plan = state.plan();

        let host = MonitorHost {
            name: config.display_name.clone(),
            address: address.to_string(),
            description: plan.describe(),
            topic: config.topic.clone(),
            enabled: true,
        };
        self.push
            .upsert_host(&host)
            .await
            .map_err(|source| SyncError::UpsertHost {
                address: address.to_string(),
                source,
            })?;

        let checks = plan.checks(address, &config);
        let mut check_failures = 0;
        for check in &checks {
            if let Err(e) = self.push.upsert_check(check).await {
                warn!(check_type = %check.check_type, error = %e, "Failed to upsert check");
                self.metrics.inc_push_errors(Operation::UpsertCheck.label());
                self.metrics.inc_check_upsert_failures(identity.kind);
                check_failures += 1;
            }
        }

        let ctx = PlanContext {
            telemetry: &self.telemetry,
            now,
        };
        let results = plan.results(address, &ctx).await;
        let pushed = match results.as_slice() {
            [] => Ok(()),
            [single] if !plan.bulk_results() => self.push.push_result(single).await,
            all => self.push.push_bulk(all).await,
        };
        pushed.map_err(|source| SyncError::PushResults {
            address: address.to_string(),
            source,
        })?;

        let checks_upserted = checks.len() - check_failures;
        self.logger.log_synced(
            address,
            identity.kind,
            checks_upserted,
            check_failures,
            results.len(),
        );

        Ok(SyncOutcome::Synced {
            checks_upserted,
            check_failures,
            results_pushed: results.len(),
        })
    }

    async fn remove(
        &self,
        kind: ResourceKind,
        address: &str,
        deleted: bool,
    ) -> Result<SyncOutcome, SyncError> {
        debug!(deleted, "Resource absent or disabled, removing host");
        self.push
            .delete_host(address)
            .await
            .map_err(|source| SyncError::RemoveHost {
                address: address.to_string(),
                source,
            })?;

        self.metrics.inc_hosts_removed(kind);
        self.logger.log_removed(address, kind, deleted);
        Ok(SyncOutcome::Removed)
    }
}
