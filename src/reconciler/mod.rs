//! Create-or-update and teardown of the objects a function owns.
//!
//! Both operations are plain functions over their inputs. They never retry;
//! the caller requeues on error.

mod errors;

pub use errors::*;

use crate::{
    builder::ResourceBuilder,
    crds::defs::Function,
    defaults::ClusterDefaults,
    merge::{merge, ManagedObject},
    registry::RuntimeRegistry,
    store::{DeleteOutcome, FunctionStore, ObjectStore},
};
use k8s_openapi::api::{
    apps::v1::Deployment,
    autoscaling::v2::HorizontalPodAutoscaler,
    core::v1::{ConfigMap, Service},
};
use kube::ResourceExt;
use tracing::{trace_span, Instrument};

/// Brings the deployment, service, configmap and (if requested) autoscaler
/// of `function` in line with its spec, the registry and the cluster defaults.
///
/// Kinds are written in that order. A failure stops the sequence; objects
/// written before it are kept.
pub async fn ensure<S>(
    store: &S,
    registry: &RuntimeRegistry,
    defaults: &ClusterDefaults,
    function: &Function,
) -> Result<(), EnsureError>
where
    S: FunctionStore + ?Sized,
{
    let builder = ResourceBuilder::new(function, registry).map_err(EnsureError::Build)?;
    let objects = builder.build();
    let namespace = builder.namespace();
    let spec = &function.spec;

    tracing::info!(%namespace, name = %builder.name(), "Ensuring function objects.");

    write(
        store,
        namespace,
        defaults,
        &objects.deployment,
        spec.to_deployment_fragment().as_ref(),
    )
    .instrument(trace_span!("EnsureDeployment"))
    .await?;

    write(
        store,
        namespace,
        defaults,
        &objects.service,
        spec.to_service_fragment().as_ref(),
    )
    .instrument(trace_span!("EnsureService"))
    .await?;

    write(store, namespace, defaults, &objects.config_map, None)
        .instrument(trace_span!("EnsureConfigMap"))
        .await?;

    match objects.autoscaler.as_ref() {
        Some(autoscaler) => {
            write(
                store,
                namespace,
                defaults,
                autoscaler,
                spec.to_autoscaler_fragment().as_ref(),
            )
            .instrument(trace_span!("EnsureAutoscaler"))
            .await?;
        }
        None => tracing::debug!("No autoscaling requested."),
    }

    Ok(())
}

/// Merges one object and creates or updates it.
async fn write<K, S>(
    store: &S,
    namespace: &str,
    defaults: &ClusterDefaults,
    baseline: &K,
    fragment: Option<&K>,
) -> Result<K, EnsureError>
where
    K: ManagedObject,
    S: ObjectStore<K> + ?Sized,
{
    let name = baseline.name_any();
    let object_error = |error| {
        EnsureError::Object(ObjectError {
            error,
            kind: K::KIND,
            namespace: namespace.to_string(),
            name: name.clone(),
        })
    };

    let mut desired =
        merge(baseline, defaults.overlay(K::KIND), fragment).map_err(|error| {
            tracing::error!(kind = %K::KIND, %error, "Merge failed.");
            object_error(WriteError::Merge(error))
        })?;

    let current = store
        .get(namespace, &name)
        .await
        .map_err(|error| object_error(WriteError::Get(error)))?;

    match current {
        None => {
            tracing::info!(kind = %K::KIND, %name, "Creating.");
            store
                .create(namespace, &desired)
                .await
                .map_err(|error| object_error(WriteError::Create(error)))
        }
        Some(current) => {
            desired.carry_over(&current);
            tracing::info!(kind = %K::KIND, %name, "Updating.");
            store
                .update(namespace, &desired)
                .await
                .map_err(|error| object_error(WriteError::Update(error)))
        }
    }
}

/// Deletes the service, configmap, deployment and autoscaler named `name`.
///
/// Absent objects are fine. Every kind is attempted; failures are returned
/// together at the end.
pub async fn delete_all<S>(store: &S, namespace: &str, name: &str) -> Result<(), DeleteError>
where
    S: FunctionStore + ?Sized,
{
    tracing::info!(%namespace, %name, "Deleting function objects.");

    let failures: Vec<DeleteFailure> = [
        delete::<Service, S>(store, namespace, name)
            .instrument(trace_span!("DeleteService"))
            .await,
        delete::<ConfigMap, S>(store, namespace, name)
            .instrument(trace_span!("DeleteConfigMap"))
            .await,
        delete::<Deployment, S>(store, namespace, name)
            .instrument(trace_span!("DeleteDeployment"))
            .await,
        delete::<HorizontalPodAutoscaler, S>(store, namespace, name)
            .instrument(trace_span!("DeleteAutoscaler"))
            .await,
    ]
    .into_iter()
    .flatten()
    .collect();

    if failures.is_empty() {
        return Ok(());
    }

    Err(DeleteError {
        namespace: namespace.to_string(),
        name: name.to_string(),
        failures,
    })
}

async fn delete<K, S>(store: &S, namespace: &str, name: &str) -> Option<DeleteFailure>
where
    K: ManagedObject,
    S: ObjectStore<K> + ?Sized,
{
    match store.delete(namespace, name).await {
        Ok(DeleteOutcome::Deleted) => {
            tracing::info!(kind = %K::KIND, "Deleted.");
            None
        }
        Ok(DeleteOutcome::Absent) => {
            tracing::debug!(kind = %K::KIND, "Already absent.");
            None
        }
        Err(error) => {
            tracing::error!(kind = %K::KIND, %error, "Failed to delete.");
            Some(DeleteFailure {
                error,
                kind: K::KIND,
            })
        }
    }
}
