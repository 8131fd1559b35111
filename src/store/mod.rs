#[cfg(test)]
pub mod memory;

use crate::utils::is_not_found;
use async_trait::async_trait;
use either::Either;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{ConfigMap, Service},
    },
    NamespaceResourceScope,
};
use kube::{
    api::{DeleteParams, PostParams},
    Api, Client as KubeClient, Error as KubeError, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// What a delete call found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object did not exist
    Absent,
}

/// Namespaced object storage for one kind.
///
/// `get` answers `None` for a missing object, `delete` answers
/// [`DeleteOutcome::Absent`]; every other failure is an error.
/// `update` relies on the concurrency token (`resourceVersion`) carried on the object.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, KubeError>;

    async fn create(&self, namespace: &str, object: &K) -> Result<K, KubeError>;

    async fn update(&self, namespace: &str, object: &K) -> Result<K, KubeError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, KubeError>;
}

/// Storage for every kind a function owns
pub trait FunctionStore:
    ObjectStore<Deployment>
    + ObjectStore<Service>
    + ObjectStore<ConfigMap>
    + ObjectStore<HorizontalPodAutoscaler>
{
}

impl<S> FunctionStore for S where
    S: ObjectStore<Deployment>
        + ObjectStore<Service>
        + ObjectStore<ConfigMap>
        + ObjectStore<HorizontalPodAutoscaler>
{
}

/// [`ObjectStore`] backed by the cluster API
#[derive(Clone)]
pub struct KubeStore {
    client: KubeClient,
}

impl KubeStore {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, KubeError> {
        self.api::<K>(namespace).get_opt(name).await
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K, KubeError> {
        self.api::<K>(namespace)
            .create(&PostParams::default(), object)
            .await
    }

    async fn update(&self, namespace: &str, object: &K) -> Result<K, KubeError> {
        self.api::<K>(namespace)
            .replace(&object.name_any(), &PostParams::default(), object)
            .await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, KubeError> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(Either::Left(_)) => {
                tracing::debug!(%namespace, %name, "Deletion started.");
                Ok(DeleteOutcome::Deleted)
            }
            Ok(Either::Right(_)) => {
                tracing::debug!(%namespace, %name, "Deleted.");
                Ok(DeleteOutcome::Deleted)
            }
            Err(error) if is_not_found(&error) => Ok(DeleteOutcome::Absent),
            Err(error) => Err(error),
        }
    }
}
