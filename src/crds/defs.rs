use crate::consts::CRD_NAME;
use k8s_openapi::api::{
    apps::v1::Deployment, autoscaling::v2::HorizontalPodAutoscaler, core::v1::ServiceSpec,
};
use kube::CustomResource;
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

pub const NAME: &str = CRD_NAME;

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema, Default)]
#[kube(
    group = "kubeless.io",
    version = "v1beta1",
    kind = "Function",
    plural = "functions",
    derive = "PartialEq",
    derive = "Default",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// function is the source code of the function
    pub function: String,

    /// deps is the content of the runtime's dependency manifest
    #[serde(default)]
    pub deps: String,

    /// handler is the entry point in the form `<module>.<function>`
    pub handler: String,

    /// runtime is the runtime family followed by its version, e.g. `ruby2.4`
    pub runtime: String,

    /// timeout in seconds exposed to the runtime
    pub timeout: Option<String>,

    /// deployment is merged on top of the generated deployment.
    /// Its first container seeds the function container.
    #[serde(default, deserialize_with = "deserialize_fragment")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub deployment: Option<Deployment>,

    /// service is merged on top of the generated service spec.
    /// Its first port is the function port.
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub service: Option<ServiceSpec>,

    /// horizontalPodAutoscaler requests autoscaling for the function
    #[serde(default, deserialize_with = "deserialize_fragment")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub horizontal_pod_autoscaler: Option<HorizontalPodAutoscaler>,
}

/// Decodes an embedded object whatever `apiVersion` and `kind` it names.
/// The managed kind is fixed, so both fields are dropped before decoding.
fn deserialize_fragment<'de, D, K>(deserializer: D) -> Result<Option<K>, D::Error>
where
    D: Deserializer<'de>,
    K: DeserializeOwned,
{
    let Some(mut fragment) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Some(fields) = fragment.as_object_mut() {
        fields.remove("apiVersion");
        fields.remove("kind");
    }

    serde_json::from_value(fragment)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        extensions: [(
            String::from("x-kubernetes-preserve-unknown-fields"),
            Value::Bool(true),
        )]
        .into(),
        ..Default::default()
    })
}

#[derive(ThisError, Debug)]
pub enum FunctionIdentityError {
    #[error("Function has no namespace")]
    Namespace,
    #[error("Failed to get owner reference")]
    OwnerReference,
}
