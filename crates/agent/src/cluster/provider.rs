//! Live resource state read from the Kubernetes API

use super::convert;
use super::resources;
use agent_lib::models::ResourceKind;
use agent_lib::state::{ProviderError, ResourceState, StateProvider};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;

/// [`StateProvider`] backed by a Kubernetes client
#[derive(Clone)]
pub struct KubeStateProvider {
    client: Client,
}

impl KubeStateProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Backups in the schedule's namespace
    pub async fn backups(&self, namespace: &str) -> Result<Vec<DynamicObject>, kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resources::backup());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn fetch_inner(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ResourceState>, kube::Error> {
        let client = self.client.clone();
        let state = match kind {
            ResourceKind::Node => Api::<Node>::all(client)
                .get_opt(name)
                .await?
                .map(|n| ResourceState::Node(convert::node_state(&n))),
            ResourceKind::Deployment => Api::<Deployment>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|d| ResourceState::Deployment(convert::deployment_state(&d))),
            ResourceKind::Ingress => Api::<Ingress>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|i| ResourceState::Ingress(convert::ingress_state(&i))),
            ResourceKind::Pvc => Api::<PersistentVolumeClaim>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|p| ResourceState::Pvc(convert::pvc_state(&p))),
            ResourceKind::BackupSchedule => {
                let api: Api<DynamicObject> =
                    Api::namespaced_with(client, namespace, &resources::schedule());
                match api.get_opt(name).await? {
                    Some(schedule) => {
                        let backups = self.backups(namespace).await?;
                        Some(ResourceState::BackupSchedule(
                            convert::backup_schedule_state(&schedule, &backups),
                        ))
                    }
                    None => None,
                }
            }
        };
        Ok(state)
    }
}

#[async_trait]
impl StateProvider for KubeStateProvider {
    async fn fetch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<ResourceState>, ProviderError> {
        self.fetch_inner(kind, namespace.unwrap_or("default"), name)
            .await
            .map_err(|e| ProviderError {
                kind,
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}
