//! Watch loops and periodic resync
//!
//! Every trigger re-reads the object and runs a full pass, so a late or
//! reordered event can never resurrect stale state. Passes for one address
//! are serialized; different addresses sync concurrently.

use super::provider::KubeStateProvider;
use agent_lib::health::{components, HealthRegistry};
use agent_lib::models::ResourceKind;
use agent_lib::resolver::is_enabled;
use agent_lib::state::StateProvider;
use agent_lib::sync::{SyncEngine, SyncError, SyncOutcome};
use dashmap::DashMap;
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, ListParams};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

/// Passes in flight at once across watchers and resync sweeps
pub const MAX_CONCURRENT_PASSES: usize = 8;

/// Runs sync passes for watch events and resync ticks
pub struct Syncer<P = KubeStateProvider> {
    engine: SyncEngine,
    provider: P,
    health: HealthRegistry,
    locks: DashMap<String, Arc<Mutex<()>>>,
    passes: Semaphore,
}

impl<P: StateProvider + 'static> Syncer<P> {
    pub fn new(engine: SyncEngine, provider: P, health: HealthRegistry) -> Self {
        Self {
            engine,
            provider,
            health,
            locks: DashMap::new(),
            passes: Semaphore::new(MAX_CONCURRENT_PASSES),
        }
    }

    /// Cap on passes running at once
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.passes = Semaphore::new(limit.max(1));
        self
    }

    /// Re-read one object and converge its host
    ///
    /// Callers for the same address queue on one lock; a pass slot is taken
    /// only once the address is free.
    pub async fn reconcile(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let address = self.engine.identity(kind, namespace, name).address();
        let lock = self.locks.entry(address.clone()).or_default().clone();
        let _guard = lock.lock().await;

        // the semaphore is never closed
        let permit = self.passes.acquire().await.ok();
        let result = self
            .engine
            .reconcile(kind, namespace, name, &self.provider)
            .await;
        drop(permit);
        self.health.record_pass(&result).await;

        if matches!(result, Ok(SyncOutcome::Removed)) {
            // drop the entry only if no other caller holds or waits on it
            self.locks
                .remove_if(&address, |_, held| Arc::strong_count(held) == 2);
        }
        result
    }

    fn spawn_reconcile(self: &Arc<Self>, kind: ResourceKind, namespace: Option<String>, name: String) {
        let syncer = Arc::clone(self);
        tokio::spawn(async move {
            // failures are logged and counted by the engine
            let _ = syncer.reconcile(kind, namespace.as_deref(), &name).await;
        });
    }
}

/// Watch one kind until the stream ends
pub async fn watch<K>(syncer: Arc<Syncer>, kind: ResourceKind, api: Api<K>)
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    let component = components::watcher(kind);
    info!(kind = %kind, "Starting watcher");

    let stream = watcher::watcher(api, watcher::Config::default()).default_backoff();
    tokio::pin!(stream);

    loop {
        match stream.try_next().await {
            Ok(Some(event)) => match event {
                Event::Applied(obj) | Event::Deleted(obj) => {
                    syncer.spawn_reconcile(kind, obj.namespace(), obj.name_any());
                }
                Event::Restarted(objs) => {
                    info!(kind = %kind, count = objs.len(), "Watcher listed objects");
                    let targets = objs
                        .into_iter()
                        .map(|obj| (obj.namespace(), obj.name_any()))
                        .collect();
                    reconcile_all(&*syncer, kind, targets).await;
                    syncer.health.set_healthy(&component).await;
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Watch stream error, backing off");
                syncer
                    .health
                    .set_degraded(&component, format!("watch error: {}", e))
                    .await;
            }
        }
    }

    warn!(kind = %kind, "Watcher stopped");
    syncer
        .health
        .set_unhealthy(&component, "watch stream ended")
        .await;
}

/// Re-sync every opted-in object of one kind
pub async fn resync<K>(syncer: Arc<Syncer>, kind: ResourceKind, api: Api<K>)
where
    K: Resource + Clone + DeserializeOwned + Debug + Send,
{
    let targets: Vec<(Option<String>, String)> = match api.list(&ListParams::default()).await {
        Ok(list) => list
            .items
            .iter()
            .filter(|obj| is_enabled(Some(obj.annotations())))
            .map(|obj| (obj.namespace(), obj.name_any()))
            .collect(),
        Err(e) => {
            warn!(kind = %kind, error = %e, "Resync list failed");
            return;
        }
    };
    debug!(kind = %kind, count = targets.len(), "Resyncing");
    reconcile_all(&*syncer, kind, targets).await;
}

/// Reconcile a batch, bounded by the syncer's pass limit
async fn reconcile_all<P: StateProvider + 'static>(
    syncer: &Syncer<P>,
    kind: ResourceKind,
    targets: Vec<(Option<String>, String)>,
) {
    futures::stream::iter(targets)
        .for_each_concurrent(MAX_CONCURRENT_PASSES, |(namespace, name)| async move {
            let _ = syncer.reconcile(kind, namespace.as_deref(), &name).await;
        })
        .await;
}
