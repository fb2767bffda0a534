//! Conversion of Kubernetes objects into engine state

use agent_lib::quantity::{parse_bytes, parse_millicores};
use agent_lib::state::{
    BackupCondition, BackupRecord, BackupScheduleState, DeploymentState, IngressState, IngressTls,
    NodeState, PvcState, ResourceMeta,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use std::collections::BTreeMap;

fn meta(object: &ObjectMeta) -> ResourceMeta {
    ResourceMeta {
        name: object.name.clone().unwrap_or_default(),
        namespace: object.namespace.clone(),
        annotations: object.annotations.clone(),
    }
}

fn quantity<'a>(map: Option<&'a BTreeMap<String, Quantity>>, key: &str) -> Option<&'a str> {
    map.and_then(|m| m.get(key)).map(|q| q.0.as_str())
}

pub fn node_state(node: &Node) -> NodeState {
    let status = node.status.as_ref();
    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let disk_pressure = status
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "DiskPressure"))
        .map(|c| c.status == "True");

    NodeState {
        meta: meta(&node.metadata),
        allocatable_memory_bytes: quantity(allocatable, "memory").and_then(parse_bytes),
        allocatable_cpu_millis: quantity(allocatable, "cpu").and_then(parse_millicores),
        disk_pressure,
    }
}

pub fn deployment_state(deployment: &Deployment) -> DeploymentState {
    let status = deployment.status.as_ref();

    DeploymentState {
        meta: meta(&deployment.metadata),
        desired_replicas: deployment.spec.as_ref().and_then(|s| s.replicas),
        ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
        available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
    }
}

pub fn ingress_state(ingress: &Ingress) -> IngressState {
    let spec = ingress.spec.as_ref();
    let hosts = spec
        .and_then(|s| s.rules.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.host.clone())
        .filter(|host| !host.is_empty())
        .collect();
    let tls = spec
        .and_then(|s| s.tls.as_ref())
        .into_iter()
        .flatten()
        .map(|t| IngressTls {
            hosts: t.hosts.clone().unwrap_or_default(),
        })
        .collect();

    IngressState {
        meta: meta(&ingress.metadata),
        hosts,
        tls,
    }
}

pub fn pvc_state(pvc: &PersistentVolumeClaim) -> PvcState {
    let spec = pvc.spec.as_ref();
    let requested = quantity(
        spec.and_then(|s| s.resources.as_ref())
            .and_then(|r| r.requests.as_ref()),
        "storage",
    );

    PvcState {
        meta: meta(&pvc.metadata),
        phase: pvc.status.as_ref().and_then(|s| s.phase.clone()),
        requested_storage: requested.map(str::to_string),
        requested_bytes: requested.and_then(parse_bytes),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()),
    }
}

/// Backup object as a record; objects without a creation time are skipped
pub fn backup_record(backup: &DynamicObject) -> Option<BackupRecord> {
    let created_at = backup.metadata.creation_timestamp.as_ref()?.0;
    let conditions = backup
        .data
        .get("status")
        .and_then(|s| s.get("conditions"))
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
        .map(|c| {
            let field = |key: &str| c.get(key).and_then(|v| v.as_str()).unwrap_or("");
            BackupCondition::new(field("type"), field("status"), field("message"))
        })
        .collect();

    Some(BackupRecord {
        name: backup.metadata.name.clone().unwrap_or_default(),
        created_at,
        conditions,
    })
}

/// Schedule state from the schedule object and the backups in its namespace
pub fn backup_schedule_state(schedule: &DynamicObject, backups: &[DynamicObject]) -> BackupScheduleState {
    BackupScheduleState {
        meta: meta(&schedule.metadata),
        backups: backups.iter().filter_map(backup_record).collect(),
    }
}
