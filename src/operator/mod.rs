mod errors;

pub use errors::*;

use crate::{
    config::ConfigSource,
    consts::FINALIZER_NAME,
    crds::defs::Function,
    reconciler::{delete_all, ensure},
    store::KubeStore,
};
use futures::stream::StreamExt;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{ConfigMap, Namespace, Service},
    },
    NamespaceResourceScope,
};
use kube::{
    runtime::{controller::Action, finalizer::Event, watcher::Config},
    runtime::{finalizer, Controller},
    Api, Client as KubeClient, Resource, ResourceExt,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{trace_span, Instrument};

struct OperatorInner {
    client: KubeClient,
    /// `None` watches every namespace
    functions_namespace: Option<String>,
    config: ConfigSource,
    store: KubeStore,
}

impl OperatorInner {
    fn new(
        client: KubeClient,
        functions_namespace: Option<String>,
        config: ConfigSource,
    ) -> Self {
        Self {
            store: KubeStore::new(client.clone()),
            client,
            functions_namespace,
            config,
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match self.functions_namespace {
            Some(ref namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    async fn reconcile(&self, function: Arc<Function>) -> Result<Action, ReconcileError> {
        let name = function.name_any();

        let Some(namespace) = function.namespace() else {
            tracing::error!(%name, "Resource has no namespace. Aborting.");
            return Err(ReconcileError::Namespace);
        };

        let api: Api<Function> = Api::namespaced(self.client.clone(), &namespace);

        let reconcile_resource_span = trace_span!("ReconcileResource", %name, %namespace);
        finalizer(&api, FINALIZER_NAME, function, |event| async move {
            match event {
                Event::Apply(function) => self
                    .apply(function)
                    .instrument(trace_span!("ApplyResource"))
                    .await
                    .map_err(FinalizeError::Apply),

                Event::Cleanup(function) => self
                    .cleanup(function, &namespace)
                    .instrument(trace_span!("CleanupResource"))
                    .await
                    .map_err(FinalizeError::Cleanup),
            }
        })
        .instrument(reconcile_resource_span)
        .await
        .map_err(|error| ReconcileError::FinalizeError(Box::new(error)))
    }

    async fn apply(&self, function: Arc<Function>) -> Result<Action, ApplyError> {
        tracing::info!("Applying resource.");

        let config = self
            .config
            .load()
            .instrument(trace_span!("LoadConfig"))
            .await
            .map_err(ApplyError::Config)?;

        ensure(&self.store, &config.registry, &config.defaults, &function)
            .instrument(trace_span!("Ensure"))
            .await
            .map_err(ApplyError::Ensure)?;

        tracing::info!("Awaiting change.");

        Ok(Action::await_change())
    }

    async fn cleanup(
        &self,
        function: Arc<Function>,
        namespace: &str,
    ) -> Result<Action, CleanupError> {
        tracing::info!("Cleaning up resource.");

        delete_all(&self.store, namespace, &function.name_any())
            .instrument(trace_span!("DeleteAll"))
            .await
            .map_err(CleanupError::Delete)?;

        tracing::info!("Awaiting change.");

        Ok(Action::await_change())
    }
}

pub struct Operator {
    inner: Arc<OperatorInner>,
}

impl Operator {
    pub fn new(
        client: KubeClient,
        functions_namespace: Option<String>,
        config: ConfigSource,
    ) -> Self {
        let inner = Arc::new(OperatorInner::new(client, functions_namespace, config));

        Self { inner }
    }

    pub async fn new_with_check_functions_namespace(
        client: KubeClient,
        functions_namespace: Option<String>,
        config: ConfigSource,
    ) -> Self {
        if let Some(ref functions_namespace) = functions_namespace {
            tracing::info!(%functions_namespace, "Checking if namespace exists.");
            let namespace_api: Api<Namespace> = Api::all(client.clone());

            match namespace_api.get_opt(functions_namespace).await {
                Ok(Some(_)) => {
                    tracing::info!("Namespace exists.");
                }
                Ok(None) => {
                    tracing::warn!("Namespace does not exist.");
                }
                Err(error) => {
                    tracing::warn!(%error, "Failed to check if namespace exists.");
                }
            }
        }

        Self::new(client, functions_namespace, config)
    }

    pub async fn run(self) {
        tracing::info!("Starting.");

        let api: Api<Function> = self.inner.api();

        Controller::new(api, Config::default())
            .owns(self.inner.api::<Deployment>(), Config::default())
            .owns(self.inner.api::<Service>(), Config::default())
            .owns(self.inner.api::<ConfigMap>(), Config::default())
            .owns(self.inner.api::<HorizontalPodAutoscaler>(), Config::default())
            .shutdown_on_signal()
            .run(reconcile, on_error, self.inner)
            .for_each(|reconciliation_result| async move {
                match reconciliation_result {
                    Ok(_) => {
                        tracing::info!("Reconciliation successful.");
                    }
                    Err(error) => {
                        tracing::error!(%error, "Reconciliation failed.");
                    }
                }
            })
            .await;

        tracing::info!("Terminated.");
    }
}

async fn reconcile(
    function: Arc<Function>,
    context: Arc<OperatorInner>,
) -> Result<Action, ReconcileError> {
    context.reconcile(function).await
}

fn on_error(
    _function: Arc<Function>,
    error: &ReconcileError,
    _context: Arc<OperatorInner>,
) -> Action {
    tracing::error!(%error, "Reconciliation failed. Requeuing.");

    Action::requeue(Duration::from_secs(10))
}
