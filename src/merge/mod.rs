//! Three-layer merge of managed objects.
//!
//! Layers, lowest to highest precedence:
//!
//! 1. the baseline built from the function and its runtime,
//! 2. the cluster overlay for the kind, parsed strictly,
//! 3. the function's own override fragment.
//!
//! Layers are applied as JSON merge patches: objects are unioned, scalars and
//! lists are replaced, `null` removes. Fields a fragment leaves unset are
//! absent from its patch and keep the value of the layer below.

mod cascade;
mod strict;

pub use cascade::AnnotationSources;
pub use strict::unknown_fields;

use crate::defaults::ObjectKind;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        autoscaling::v2::HorizontalPodAutoscaler,
        core::v1::{ConfigMap, Service},
    },
    NamespaceResourceScope,
};
use kube::Resource;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum MergeError {
    #[error("Failed to parse {kind} overlay: {source}")]
    ParseOverlay {
        kind: ObjectKind,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{kind} overlay is not an object")]
    OverlayNotAnObject { kind: ObjectKind },
    #[error("Unknown field(s) in {kind} overlay: {}", .fields.join(", "))]
    UnknownFields {
        kind: ObjectKind,
        fields: Vec<String>,
    },
    #[error("Failed to serialize {kind}: {source}")]
    Serialize {
        kind: ObjectKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to deserialize merged {kind}: {source}")]
    Deserialize {
        kind: ObjectKind,
        #[source]
        source: serde_json::Error,
    },
}

/// The three layers as JSON documents
#[derive(Debug, Clone, Copy)]
pub struct Layers<'a> {
    pub baseline: &'a Value,
    pub overlay: Option<&'a Value>,
    pub fragment: Option<&'a Value>,
}

/// An object kind that is built, merged and written for a function.
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Serialize
    + DeserializeOwned
    + JsonSchema
    + Clone
    + Debug
    + Send
    + Sync
    + 'static
{
    const KIND: ObjectKind;

    /// The fragment as a merge patch.
    fn fragment_patch(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Kind specific steps run on the merged document.
    fn cascade(_merged: &mut Value, _layers: &Layers<'_>) {}

    /// Copies what the store owns from the current object before an update.
    fn carry_over(&mut self, current: &Self) {
        self.meta_mut().resource_version = current.meta().resource_version.clone();
    }
}

impl ManagedObject for Deployment {
    const KIND: ObjectKind = ObjectKind::Deployment;

    /// Containers are left out, the builder seeds the function container from them.
    fn fragment_patch(&self) -> Result<Value, serde_json::Error> {
        let mut patch = serde_json::to_value(self)?;
        remove_field(&mut patch, "/spec/template/spec", "containers");
        Ok(patch)
    }

    fn cascade(merged: &mut Value, layers: &Layers<'_>) {
        AnnotationSources::from_layers(layers).apply(merged);
    }
}

impl ManagedObject for Service {
    const KIND: ObjectKind = ObjectKind::Service;

    fn carry_over(&mut self, current: &Self) {
        self.metadata.resource_version = current.metadata.resource_version.clone();

        let Some(current_spec) = current.spec.as_ref() else {
            return;
        };
        if let Some(spec) = self.spec.as_mut() {
            if spec.cluster_ip.is_none() {
                spec.cluster_ip = current_spec.cluster_ip.clone();
                spec.cluster_ips = current_spec.cluster_ips.clone();
            }
        }
    }
}

impl ManagedObject for ConfigMap {
    const KIND: ObjectKind = ObjectKind::ConfigMap;
}

impl ManagedObject for HorizontalPodAutoscaler {
    const KIND: ObjectKind = ObjectKind::HorizontalPodAutoscaler;

    /// The target is always the function's deployment. A `maxReplicas` of 0
    /// is an unset field and keeps the built value.
    fn fragment_patch(&self) -> Result<Value, serde_json::Error> {
        let mut patch = serde_json::to_value(self)?;
        remove_field(&mut patch, "/spec", "scaleTargetRef");
        if patch.pointer("/spec/maxReplicas") == Some(&Value::from(0)) {
            remove_field(&mut patch, "/spec", "maxReplicas");
        }
        Ok(patch)
    }
}

fn remove_field(document: &mut Value, parent: &str, field: &str) {
    if let Some(parent) = document.pointer_mut(parent).and_then(Value::as_object_mut) {
        parent.remove(field);
    }
}

/// Parses an overlay document (JSON or YAML) with strict field recognition.
pub fn parse_overlay<K: ManagedObject>(raw: &str) -> Result<Value, MergeError> {
    let document = match serde_json::from_str::<Value>(raw) {
        Ok(document) => document,
        Err(_) => serde_yaml::from_str::<Value>(raw).map_err(|source| MergeError::ParseOverlay {
            kind: K::KIND,
            source,
        })?,
    };

    let mut document = match document {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => document,
        _ => return Err(MergeError::OverlayNotAnObject { kind: K::KIND }),
    };

    let fields = unknown_fields::<K>(&document);
    if !fields.is_empty() {
        return Err(MergeError::UnknownFields {
            kind: K::KIND,
            fields,
        });
    }

    if let Some(fields) = document.as_object_mut() {
        fields
            .entry("apiVersion")
            .or_insert_with(|| Value::String(K::api_version(&()).into_owned()));
        fields
            .entry("kind")
            .or_insert_with(|| Value::String(K::kind(&()).into_owned()));
    }

    Ok(document)
}

/// Merges the overlay and the fragment onto the baseline.
///
/// Either the whole merge succeeds or nothing is returned. Name, namespace and
/// owner references of the result are always the baseline's. Resource version
/// and uid belong to the store and are cleared.
pub fn merge<K: ManagedObject>(
    baseline: &K,
    overlay: Option<&str>,
    fragment: Option<&K>,
) -> Result<K, MergeError> {
    let serialize_error = |source| MergeError::Serialize {
        kind: K::KIND,
        source,
    };

    let baseline_document = serde_json::to_value(baseline).map_err(serialize_error)?;
    let overlay = overlay.map(parse_overlay::<K>).transpose()?;
    let fragment = fragment
        .map(K::fragment_patch)
        .transpose()
        .map_err(serialize_error)?;

    let mut merged = baseline_document.clone();
    for layer in [overlay.as_ref(), fragment.as_ref()].into_iter().flatten() {
        json_patch::merge(&mut merged, layer);
    }

    K::cascade(
        &mut merged,
        &Layers {
            baseline: &baseline_document,
            overlay: overlay.as_ref(),
            fragment: fragment.as_ref(),
        },
    );

    let mut object: K =
        serde_json::from_value(merged).map_err(|source| MergeError::Deserialize {
            kind: K::KIND,
            source,
        })?;

    let identity = baseline.meta();
    let meta = object.meta_mut();
    meta.name = identity.name.clone();
    meta.namespace = identity.namespace.clone();
    meta.owner_references = identity.owner_references.clone();
    meta.resource_version = None;
    meta.uid = None;

    Ok(object)
}
