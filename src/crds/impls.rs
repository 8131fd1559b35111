use super::defs::{Function, FunctionIdentityError, FunctionSpec};
use crate::consts::{
    CREATED_BY_LABEL, CREATED_BY_VALUE, DEFAULT_FUNCTION_PORT, DEFAULT_FUNCTION_TIMEOUT,
    FUNCTION_LABEL,
};
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{Container, Service},
    },
    apimachinery::pkg::{apis::meta::v1::OwnerReference, util::intstr::IntOrString},
};
use kube::{CustomResourceExt, Resource, ResourceExt};
use std::collections::BTreeMap;

impl FunctionSpec {
    /// The module part of the handler, `foo` for `foo.bar`
    pub fn to_module_name(&self) -> &str {
        self.handler
            .split_once('.')
            .map_or(self.handler.as_str(), |(module, _)| module)
    }

    /// The function part of the handler, `bar` for `foo.bar`
    pub fn to_function_name(&self) -> &str {
        self.handler
            .split_once('.')
            .map_or(self.handler.as_str(), |(_, function)| function)
    }

    pub fn to_timeout(&self) -> String {
        self.timeout
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_FUNCTION_TIMEOUT))
    }

    /// The port of the first service port, preferring its target port.
    pub fn to_port(&self) -> i32 {
        let Some(port) = self
            .service
            .as_ref()
            .and_then(|service| service.ports.as_ref())
            .and_then(|ports| ports.first())
        else {
            return DEFAULT_FUNCTION_PORT;
        };

        match port.target_port {
            Some(IntOrString::Int(target_port)) => target_port,
            _ => port.port,
        }
    }

    pub fn has_deps(&self) -> bool {
        !self.deps.trim().is_empty()
    }

    /// The author's first container, the seed for the function container.
    pub fn to_container_seed(&self) -> Option<&Container> {
        self.deployment
            .as_ref()
            .and_then(|deployment| deployment.spec.as_ref())
            .and_then(|spec| spec.template.spec.as_ref())
            .and_then(|pod_spec| pod_spec.containers.first())
    }

    pub fn wants_autoscaling(&self) -> bool {
        self.horizontal_pod_autoscaler.is_some()
    }

    pub fn to_deployment_fragment(&self) -> Option<Deployment> {
        self.deployment.clone()
    }

    pub fn to_service_fragment(&self) -> Option<Service> {
        self.service.clone().map(|spec| Service {
            spec: Some(spec),
            ..Default::default()
        })
    }

    pub fn to_autoscaler_fragment(&self) -> Option<HorizontalPodAutoscaler> {
        self.horizontal_pod_autoscaler.clone()
    }
}

impl Function {
    pub fn to_name(&self) -> String {
        self.name_any()
    }

    pub fn to_namespace(&self) -> Result<String, FunctionIdentityError> {
        self.namespace().ok_or(FunctionIdentityError::Namespace)
    }

    pub fn to_owner_reference(&self) -> Result<OwnerReference, FunctionIdentityError> {
        self.controller_owner_ref(&())
            .ok_or(FunctionIdentityError::OwnerReference)
    }

    pub fn to_selector_labels(&self) -> BTreeMap<String, String> {
        [
            (String::from(FUNCTION_LABEL), self.to_name()),
            (String::from(CREATED_BY_LABEL), String::from(CREATED_BY_VALUE)),
        ]
        .into()
    }

    /// Function labels plus the selector labels, selector labels win.
    pub fn to_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels().clone();
        labels.extend(self.to_selector_labels());
        labels
    }

    pub fn generate_crd_yaml() -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Function::crd())
    }
}
