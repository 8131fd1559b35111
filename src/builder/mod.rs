//! Baseline objects for a function.
//!
//! [`ResourceBuilder`] resolves everything that can fail (identity, runtime
//! lookup, images) up front, so turning it into objects cannot fail and a
//! failed build never yields part of the set.

mod autoscaler;
mod config_map;
mod deployment;
mod service;

use crate::{
    crds::defs::{Function, FunctionIdentityError},
    registry::{ImagePhase, RegistryError, RuntimeMatch, RuntimeRegistry},
};
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{ConfigMap, Service},
    },
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::core::ObjectMeta;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BuildError {
    #[error("Invalid function identity: {0}")]
    Identity(#[source] FunctionIdentityError),
    #[error("Runtime lookup failed: {0}")]
    Lookup(#[source] RegistryError),
}

/// The image and command that install a function's dependencies
#[derive(Debug, Clone, Copy)]
pub struct InstallStep<'a> {
    pub image: &'a str,
    pub command: Option<&'a str>,
    pub env: Option<&'a BTreeMap<String, String>>,
}

pub struct ResourceBuilder<'a> {
    function: &'a Function,
    runtime: RuntimeMatch<'a>,
    name: String,
    namespace: String,
    owner_reference: OwnerReference,
    /// `None` when the matched version lists no runtime-phase image
    runtime_image: Option<&'a str>,
    install: Option<InstallStep<'a>>,
}

impl<'a> ResourceBuilder<'a> {
    pub fn new(function: &'a Function, registry: &'a RuntimeRegistry) -> Result<Self, BuildError> {
        let namespace = function.to_namespace().map_err(BuildError::Identity)?;
        let owner_reference = function.to_owner_reference().map_err(BuildError::Identity)?;

        let runtime = registry
            .lookup_runtime(&function.spec.runtime)
            .map_err(BuildError::Lookup)?;
        let runtime_image = runtime.version.image(ImagePhase::Runtime);

        let install = if function.spec.has_deps() {
            let image = runtime.image(ImagePhase::Init).map_err(BuildError::Lookup)?;
            let phase_image = runtime.version.phase_image(ImagePhase::Init);
            Some(InstallStep {
                image,
                command: phase_image.and_then(|phase_image| phase_image.command.as_deref()),
                env: phase_image.map(|phase_image| &phase_image.env),
            })
        } else {
            None
        };

        Ok(Self {
            function,
            runtime,
            name: function.to_name(),
            namespace,
            owner_reference,
            runtime_image,
            install,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn to_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.function.to_labels()),
            owner_references: Some(vec![self.owner_reference.clone()]),
            ..Default::default()
        }
    }

    fn to_source_volume_name(&self) -> String {
        format!("{}-src", self.name)
    }

    fn to_deps_volume_name(&self) -> String {
        format!("{}-deps", self.name)
    }

    pub fn build(&self) -> ManagedObjectSet {
        ManagedObjectSet::from(self)
    }
}

/// Every object a function owns, as built before any merge
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObjectSet {
    pub deployment: Deployment,
    pub service: Service,
    pub config_map: ConfigMap,
    /// Only when the function asks for scaling
    pub autoscaler: Option<HorizontalPodAutoscaler>,
}

impl From<&ResourceBuilder<'_>> for ManagedObjectSet {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        ManagedObjectSet {
            deployment: Deployment::from(value),
            service: Service::from(value),
            config_map: ConfigMap::from(value),
            autoscaler: Option::<HorizontalPodAutoscaler>::from(value),
        }
    }
}
