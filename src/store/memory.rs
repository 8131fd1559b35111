//! In-memory [`ObjectStore`] for tests.
//!
//! Records every call, can be told to fail a verb for a kind, and checks the
//! `resourceVersion` on create and update the way the API server does.

use super::{DeleteOutcome, ObjectStore};
use crate::utils::api_error;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{Error as KubeError, Resource};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAction {
    pub verb: Verb,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type ObjectKey = (String, String, String);

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    actions: Mutex<Vec<StoreAction>>,
    failures: Mutex<Vec<(Verb, String)>>,
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).into_owned()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without recording an action.
    pub fn insert<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let key = (
            kind_of::<K>(),
            object.meta().namespace.clone().unwrap_or_default(),
            object.meta().name.clone().unwrap_or_default(),
        );
        let mut value = serde_json::to_value(object).expect("object serializes");
        value["metadata"]["resourceVersion"] = Value::String(String::from("1"));
        self.objects.lock().unwrap().insert(key, value);
    }

    pub fn object<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.objects
            .lock()
            .unwrap()
            .get(&(kind_of::<K>(), namespace.to_string(), name.to_string()))
            .map(|value| serde_json::from_value(value.clone()).expect("object deserializes"))
    }

    pub fn contains<K>(&self, namespace: &str, name: &str) -> bool
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.object::<K>(namespace, name).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Makes every `verb` call for `kind` fail with a 403.
    pub fn fail_on(&self, verb: Verb, kind: &str) {
        self.failures.lock().unwrap().push((verb, kind.to_string()));
    }

    pub fn actions(&self) -> Vec<StoreAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn actions_with(&self, verb: Verb) -> Vec<StoreAction> {
        self.actions()
            .into_iter()
            .filter(|action| action.verb == verb)
            .collect()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    fn record(&self, verb: Verb, kind: &str, namespace: &str, name: &str) -> Result<(), KubeError> {
        self.actions.lock().unwrap().push(StoreAction {
            verb,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        let failing = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(failing_verb, failing_kind)| *failing_verb == verb && failing_kind == kind);

        if failing {
            return Err(api_error(403, "Forbidden", format!("{verb:?} {kind} is forbidden")));
        }

        Ok(())
    }
}

fn without_resource_version(value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("resourceVersion");
    }
    value
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, KubeError> {
        let kind = kind_of::<K>();
        self.record(Verb::Get, &kind, namespace, name)?;

        let objects = self.objects.lock().unwrap();
        Ok(objects
            .get(&(kind, namespace.to_string(), name.to_string()))
            .map(|value| serde_json::from_value(value.clone()).expect("object deserializes")))
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K, KubeError> {
        let kind = kind_of::<K>();
        let name = object.meta().name.clone().unwrap_or_default();
        self.record(Verb::Create, &kind, namespace, &name)?;

        let mut objects = self.objects.lock().unwrap();
        let key = (kind.clone(), namespace.to_string(), name.clone());
        if objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{kind} {name} already exists")));
        }
        if object.meta().resource_version.is_some() {
            return Err(api_error(
                400,
                "BadRequest",
                String::from("resourceVersion should not be set on objects to be created"),
            ));
        }

        let mut value = serde_json::to_value(object).expect("object serializes");
        value["metadata"]["resourceVersion"] = Value::String(String::from("1"));
        objects.insert(key, value.clone());

        Ok(serde_json::from_value(value).expect("object deserializes"))
    }

    async fn update(&self, namespace: &str, object: &K) -> Result<K, KubeError> {
        let kind = kind_of::<K>();
        let name = object.meta().name.clone().unwrap_or_default();
        self.record(Verb::Update, &kind, namespace, &name)?;

        let mut objects = self.objects.lock().unwrap();
        let key = (kind.clone(), namespace.to_string(), name.clone());
        let Some(stored) = objects.get(&key) else {
            return Err(api_error(404, "NotFound", format!("{kind} {name} not found")));
        };

        let stored_version = stored["metadata"]["resourceVersion"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if object.meta().resource_version.as_deref() != Some(stored_version.as_str()) {
            return Err(api_error(409, "Conflict", format!("{kind} {name} was modified")));
        }

        let mut value = serde_json::to_value(object).expect("object serializes");
        let version = if without_resource_version(&value) == without_resource_version(stored) {
            stored_version
        } else {
            let current: u64 = stored_version.parse().unwrap_or_default();
            (current + 1).to_string()
        };
        value["metadata"]["resourceVersion"] = Value::String(version);
        objects.insert(key, value.clone());

        Ok(serde_json::from_value(value).expect("object deserializes"))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, KubeError> {
        let kind = kind_of::<K>();
        self.record(Verb::Delete, &kind, namespace, name)?;

        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(kind, namespace.to_string(), name.to_string()));

        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::Absent,
        })
    }
}
