//! Kubernetes adapter
//!
//! This module provides:
//! - Conversion of API objects into engine state
//! - A live [`StateProvider`](agent_lib::state::StateProvider) and node telemetry
//! - Watch loops and the periodic resync per resource kind

pub mod convert;
mod provider;
mod resources;
mod telemetry;
mod watch;

pub use provider::KubeStateProvider;
pub use telemetry::KubeTelemetry;
pub use watch::Syncer;

use agent_lib::models::ResourceKind;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DynamicObject};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the watcher and the resync loop for one kind
pub fn spawn_kind(
    client: Client,
    syncer: Arc<Syncer>,
    kind: ResourceKind,
    resync_every: Duration,
) -> Vec<JoinHandle<()>> {
    match kind {
        ResourceKind::Node => spawn_for(syncer, kind, Api::<Node>::all(client), resync_every),
        ResourceKind::Deployment => {
            spawn_for(syncer, kind, Api::<Deployment>::all(client), resync_every)
        }
        ResourceKind::Ingress => spawn_for(syncer, kind, Api::<Ingress>::all(client), resync_every),
        ResourceKind::Pvc => spawn_for(
            syncer,
            kind,
            Api::<PersistentVolumeClaim>::all(client),
            resync_every,
        ),
        ResourceKind::BackupSchedule => spawn_for(
            syncer,
            kind,
            Api::<DynamicObject>::all_with(client, &resources::schedule()),
            resync_every,
        ),
    }
}

fn spawn_for<K>(
    syncer: Arc<Syncer>,
    kind: ResourceKind,
    api: Api<K>,
    resync_every: Duration,
) -> Vec<JoinHandle<()>>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let watcher = tokio::spawn(watch::watch(Arc::clone(&syncer), kind, api.clone()));

    let resync = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(resync_every);
        // the watcher's initial listing covers startup
        ticker.tick().await;
        loop {
            ticker.tick().await;
            watch::resync(Arc::clone(&syncer), kind, api.clone()).await;
        }
    });

    vec![watcher, resync]
}
