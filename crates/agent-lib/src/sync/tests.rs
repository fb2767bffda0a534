//! Scenario tests for the sync engine
//!
//! These tests verify:
//! - Host/check/result ordering and idempotent payloads
//! - Removal on deletion and on opt-out
//! - Failure isolation between checks and abort on host failure
//! - Per-kind results pushed to the monitoring service

use super::*;
use crate::models::{check_types, CheckStatus, MonitorCheck, MonitorHost, MonitorResult, ResourceKind};
use crate::push::{Operation, PushApi, PushError};
use crate::resolver::annotations;
use crate::state::{
    BackupCondition, BackupRecord, BackupScheduleState, DeploymentState, IngressState, IngressTls,
    NodeState, ProviderError, PvcState, ResourceMeta, ResourceState, StateProvider,
};
use crate::telemetry::{
    FsUsage, FsUsageProvider, NodeMetricsProvider, NodeUsage, TelemetrySources,
    TelemetryUnavailable,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

/// One recorded push API call
#[derive(Debug, Clone, PartialEq)]
enum Call {
    UpsertHost(MonitorHost),
    DeleteHost(String),
    UpsertCheck(MonitorCheck),
    PushResult(MonitorResult),
    PushBulk(Vec<MonitorResult>),
}

/// In-memory push API that records calls and fails on demand
#[derive(Default)]
struct RecordingPush {
    calls: Mutex<Vec<Call>>,
    fail_host: bool,
    fail_check_type: Option<&'static str>,
    fail_results: bool,
}

impl RecordingPush {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected(operation: Operation, target: &str) -> PushError {
        PushError::UnexpectedStatus {
            operation,
            target: target.to_string(),
            status: 500,
            body: "boom".to_string(),
        }
    }
}

#[async_trait]
impl PushApi for RecordingPush {
    async fn upsert_host(&self, host: &MonitorHost) -> Result<(), PushError> {
        self.record(Call::UpsertHost(host.clone()));
        if self.fail_host {
            return Err(Self::rejected(Operation::UpsertHost, &host.address));
        }
        Ok(())
    }

    async fn delete_host(&self, address: &str) -> Result<(), PushError> {
        self.record(Call::DeleteHost(address.to_string()));
        Ok(())
    }

    async fn upsert_check(&self, check: &MonitorCheck) -> Result<(), PushError> {
        self.record(Call::UpsertCheck(check.clone()));
        if self.fail_check_type == Some(check.check_type.as_str()) {
            return Err(Self::rejected(Operation::UpsertCheck, &check.host_address));
        }
        Ok(())
    }

    async fn delete_check(&self, _host_address: &str, _check_type: &str) -> Result<(), PushError> {
        Ok(())
    }

    async fn push_result(&self, result: &MonitorResult) -> Result<(), PushError> {
        self.record(Call::PushResult(result.clone()));
        if self.fail_results {
            return Err(Self::rejected(Operation::PushResult, &result.host_address));
        }
        Ok(())
    }

    async fn push_bulk(&self, results: &[MonitorResult]) -> Result<(), PushError> {
        self.record(Call::PushBulk(results.to_vec()));
        if self.fail_results {
            return Err(Self::rejected(Operation::PushBulk, "bulk"));
        }
        Ok(())
    }
}

/// Fixed telemetry answers per source
struct FakeTelemetry {
    usage: Option<NodeUsage>,
    fs: Option<FsUsage>,
}

#[async_trait]
impl NodeMetricsProvider for FakeTelemetry {
    async fn node_usage(&self, _node_name: &str) -> Result<NodeUsage, TelemetryUnavailable> {
        self.usage
            .ok_or_else(|| TelemetryUnavailable::new("Metrics API not available"))
    }
}

#[async_trait]
impl FsUsageProvider for FakeTelemetry {
    async fn fs_usage(&self, _node_name: &str) -> Result<FsUsage, TelemetryUnavailable> {
        self.fs
            .ok_or_else(|| TelemetryUnavailable::new("Kubelet stats not available"))
    }
}

/// Provider answering from a fixed slot
struct FixedProvider {
    answer: Result<Option<ResourceState>, String>,
}

#[async_trait]
impl StateProvider for FixedProvider {
    async fn fetch(
        &self,
        kind: ResourceKind,
        _namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<ResourceState>, ProviderError> {
        self.answer.clone().map_err(|reason| ProviderError {
            kind,
            name: name.to_string(),
            reason,
        })
    }
}

fn engine(push: &Arc<RecordingPush>) -> SyncEngine {
    SyncEngine::new(push.clone(), "prod")
}

fn enabled(name: &str, namespace: Option<&str>) -> ResourceMeta {
    ResourceMeta::new(name, namespace).with_annotation(annotations::ENABLED, "true")
}

fn deployment(ready: i32) -> ResourceState {
    ResourceState::Deployment(DeploymentState {
        meta: enabled("api", Some("shop")),
        desired_replicas: Some(3),
        ready_replicas: ready,
        available_replicas: ready,
    })
}

const DEPLOYMENT_ADDRESS: &str = "k8s://prod/deployment/shop/api";

mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_host_then_checks_then_results() {
        let push = Arc::new(RecordingPush::default());
        let outcome = engine(&push)
            .sync(ResourceKind::Deployment, Some("shop"), "api", Some(&deployment(3)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                checks_upserted: 1,
                check_failures: 0,
                results_pushed: 1,
            }
        );

        let calls = push.calls();
        assert_eq!(calls.len(), 3);
        match &calls[0] {
            Call::UpsertHost(host) => {
                assert_eq!(host.address, DEPLOYMENT_ADDRESS);
                assert_eq!(host.name, "api");
                assert_eq!(host.topic, "Kubernetes/prod/deployment/shop");
                assert_eq!(host.description, "Deployment shop/api");
                assert!(host.enabled);
            }
            other => panic!("expected host upsert first, got {:?}", other),
        }
        assert!(matches!(&calls[1], Call::UpsertCheck(c) if c.check_type == check_types::STATUS));
        match &calls[2] {
            Call::PushResult(result) => {
                assert_eq!(result.status, CheckStatus::Ok);
                assert_eq!(result.message, "3/3 replicas ready");
            }
            other => panic!("expected single result push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeated_sync_sends_identical_payloads() {
        let push = Arc::new(RecordingPush::default());
        let engine = engine(&push);
        let state = deployment(2);

        engine
            .sync(ResourceKind::Deployment, Some("shop"), "api", Some(&state))
            .await
            .unwrap();
        let first = push.calls();
        engine
            .sync(ResourceKind::Deployment, Some("shop"), "api", Some(&state))
            .await
            .unwrap();
        let all = push.calls();

        assert_eq!(all.len(), first.len() * 2);
        assert_eq!(&all[first.len()..], first.as_slice());
    }

    #[tokio::test]
    async fn test_deleted_resource_removes_host() {
        let push = Arc::new(RecordingPush::default());
        let outcome = engine(&push)
            .sync(ResourceKind::Deployment, Some("shop"), "api", None)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Removed);
        assert_eq!(push.calls(), vec![Call::DeleteHost(DEPLOYMENT_ADDRESS.to_string())]);
    }

    #[tokio::test]
    async fn test_disabled_resource_removes_host() {
        let push = Arc::new(RecordingPush::default());
        let mut state = DeploymentState {
            meta: ResourceMeta::new("api", Some("shop"))
                .with_annotation(annotations::ENABLED, "false"),
            ..Default::default()
        };
        let outcome = engine(&push)
            .sync(
                ResourceKind::Deployment,
                Some("shop"),
                "api",
                Some(&ResourceState::Deployment(state.clone())),
            )
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Removed);

        // no annotation at all means not opted in
        state.meta.annotations = None;
        engine(&push)
            .sync(
                ResourceKind::Deployment,
                Some("shop"),
                "api",
                Some(&ResourceState::Deployment(state)),
            )
            .await
            .unwrap();

        let calls = push.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|c| *c == Call::DeleteHost(DEPLOYMENT_ADDRESS.to_string())));
    }

    #[tokio::test]
    async fn test_host_failure_aborts_pass() {
        let push = Arc::new(RecordingPush {
            fail_host: true,
            ..Default::default()
        });
        let err = engine(&push)
            .sync(ResourceKind::Deployment, Some("shop"), "api", Some(&deployment(3)))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::UpsertHost { .. }));
        assert_eq!(push.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_check_failure_does_not_block_siblings() {
        let push = Arc::new(RecordingPush {
            fail_check_type: Some(check_types::MEMORY),
            ..Default::default()
        });
        let node = ResourceState::Node(NodeState {
            meta: enabled("worker-1", None),
            ..Default::default()
        });
        let outcome = engine(&push)
            .sync(ResourceKind::Node, None, "worker-1", Some(&node))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                checks_upserted: 2,
                check_failures: 1,
                results_pushed: 3,
            }
        );
        let checks = push
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UpsertCheck(_)))
            .count();
        assert_eq!(checks, 3);
        assert!(matches!(push.calls().last(), Some(Call::PushBulk(_))));
    }

    #[tokio::test]
    async fn test_result_failure_fails_pass() {
        let push = Arc::new(RecordingPush {
            fail_results: true,
            ..Default::default()
        });
        let err = engine(&push)
            .sync(ResourceKind::Deployment, Some("shop"), "api", Some(&deployment(3)))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::PushResults { .. }));
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected() {
        let push = Arc::new(RecordingPush::default());
        let err = engine(&push)
            .sync(ResourceKind::Pvc, Some("shop"), "api", Some(&deployment(3)))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::KindMismatch { .. }));
        assert!(push.calls().is_empty());
    }
}

mod reconcile_tests {
    use super::*;

    #[tokio::test]
    async fn test_reconcile_missing_resource_removes_host() {
        let push = Arc::new(RecordingPush::default());
        let provider = FixedProvider { answer: Ok(None) };
        let outcome = engine(&push)
            .reconcile(ResourceKind::Deployment, Some("shop"), "api", &provider)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Removed);
        assert_eq!(push.calls(), vec![Call::DeleteHost(DEPLOYMENT_ADDRESS.to_string())]);
    }

    #[tokio::test]
    async fn test_reconcile_provider_error_touches_nothing() {
        let push = Arc::new(RecordingPush::default());
        let provider = FixedProvider {
            answer: Err("connection refused".to_string()),
        };
        let err = engine(&push)
            .reconcile(ResourceKind::Deployment, Some("shop"), "api", &provider)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Provider(_)));
        assert!(push.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_present_resource_syncs() {
        let push = Arc::new(RecordingPush::default());
        let provider = FixedProvider {
            answer: Ok(Some(deployment(1))),
        };
        engine(&push)
            .reconcile(ResourceKind::Deployment, Some("shop"), "api", &provider)
            .await
            .unwrap();

        match push.calls().last() {
            Some(Call::PushResult(result)) => assert_eq!(result.status, CheckStatus::Warning),
            other => panic!("expected result push, got {:?}", other),
        }
    }
}

mod kind_tests {
    use super::*;

    #[tokio::test]
    async fn test_ingress_pushes_checks_without_results() {
        let push = Arc::new(RecordingPush::default());
        let ingress = ResourceState::Ingress(IngressState {
            meta: enabled("site", Some("web")),
            hosts: vec!["a.example.com".to_string(), "b.example.com".to_string()],
            tls: vec![IngressTls {
                hosts: vec!["b.example.com".to_string()],
            }],
        });
        let outcome = engine(&push)
            .sync(ResourceKind::Ingress, Some("web"), "site", Some(&ingress))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                checks_upserted: 3,
                check_failures: 0,
                results_pushed: 0,
            }
        );
        let calls = push.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls
            .iter()
            .all(|c| !matches!(c, Call::PushResult(_) | Call::PushBulk(_))));
    }

    #[tokio::test]
    async fn test_node_without_metrics_reports_unknown() {
        let push = Arc::new(RecordingPush::default());
        let telemetry = Arc::new(FakeTelemetry {
            usage: None,
            fs: Some(FsUsage {
                used_bytes: 85,
                capacity_bytes: 100,
            }),
        });
        let engine = engine(&push)
            .with_telemetry(TelemetrySources::new(telemetry.clone(), telemetry));
        let node = ResourceState::Node(NodeState {
            meta: enabled("worker-1", None),
            allocatable_memory_bytes: Some(8 * 1024 * 1024 * 1024),
            allocatable_cpu_millis: Some(4000),
            disk_pressure: Some(false),
        });
        engine
            .sync(ResourceKind::Node, None, "worker-1", Some(&node))
            .await
            .unwrap();

        let results = match push.calls().last() {
            Some(Call::PushBulk(results)) => results.clone(),
            other => panic!("expected bulk push, got {:?}", other),
        };
        let by_type = |t: &str| results.iter().find(|r| r.check_type == t).unwrap().clone();

        assert_eq!(by_type(check_types::LOAD).status, CheckStatus::Unknown);
        assert_eq!(by_type(check_types::MEMORY).status, CheckStatus::Unknown);
        let disk = by_type(check_types::DISK);
        assert_eq!(disk.status, CheckStatus::Warning);
        assert_eq!(disk.value, Some(85.0));
    }

    #[tokio::test]
    async fn test_node_with_metrics_reports_usage() {
        let push = Arc::new(RecordingPush::default());
        let telemetry = Arc::new(FakeTelemetry {
            usage: Some(NodeUsage {
                memory_bytes: 950,
                cpu_millis: 1000,
            }),
            fs: None,
        });
        let engine = engine(&push)
            .with_telemetry(TelemetrySources::new(telemetry.clone(), telemetry));
        let node = ResourceState::Node(NodeState {
            meta: enabled("worker-1", None),
            allocatable_memory_bytes: Some(1000),
            allocatable_cpu_millis: Some(4000),
            disk_pressure: Some(true),
        });
        engine
            .sync(ResourceKind::Node, None, "worker-1", Some(&node))
            .await
            .unwrap();

        let results = match push.calls().last() {
            Some(Call::PushBulk(results)) => results.clone(),
            other => panic!("expected bulk push, got {:?}", other),
        };
        let statuses: Vec<CheckStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![CheckStatus::Ok, CheckStatus::Critical, CheckStatus::Critical]
        );
        assert!(results
            .iter()
            .all(|r| r.host_address == "k8s://prod/node/worker-1"));
    }

    #[tokio::test]
    async fn test_pvc_pushes_disk_result() {
        let push = Arc::new(RecordingPush::default());
        let pvc = ResourceState::Pvc(PvcState {
            meta: enabled("data", Some("db")),
            phase: Some("Pending".to_string()),
            requested_storage: Some("10Gi".to_string()),
            requested_bytes: Some(10 * 1024 * 1024 * 1024),
            storage_class: Some("standard".to_string()),
        });
        engine(&push)
            .sync(ResourceKind::Pvc, Some("db"), "data", Some(&pvc))
            .await
            .unwrap();

        match push.calls().last() {
            Some(Call::PushResult(result)) => {
                assert_eq!(result.check_type, check_types::DISK);
                assert_eq!(result.status, CheckStatus::Warning);
                assert_eq!(result.value, Some(10.0));
                assert_eq!(result.host_address, "k8s://prod/pvc/db/data");
            }
            other => panic!("expected result push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backup_schedule_uses_latest_backup() {
        let push = Arc::new(RecordingPush::default());
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let schedule = ResourceState::BackupSchedule(BackupScheduleState {
            meta: enabled("nightly", Some("db")),
            backups: vec![
                BackupRecord {
                    name: "old".to_string(),
                    created_at: now - Duration::hours(30),
                    conditions: vec![BackupCondition::new("Completed", "True", "")],
                },
                BackupRecord {
                    name: "new".to_string(),
                    created_at: now - Duration::hours(3),
                    conditions: vec![BackupCondition::new("Failed", "True", "repo locked")],
                },
            ],
        });
        engine(&push)
            .sync_at(
                ResourceKind::BackupSchedule,
                Some("db"),
                "nightly",
                Some(&schedule),
                now,
            )
            .await
            .unwrap();

        match push.calls().last() {
            Some(Call::PushResult(result)) => {
                assert_eq!(result.status, CheckStatus::Critical);
                assert_eq!(result.message, "Last backup failed 3h ago: repo locked");
                assert_eq!(result.value, Some(3.0 * 3600.0));
                assert_eq!(result.host_address, "k8s://prod/backup-schedule/db/nightly");
            }
            other => panic!("expected result push, got {:?}", other),
        }
    }
}
