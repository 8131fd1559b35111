//! Controller configuration, read from a ConfigMap.
//!
//! The `runtime-images` entry holds the runtime registry. The `deployment`,
//! `service`, `configmap` and `horizontalPodAutoscaler` entries hold the
//! cluster defaults overlay.

use crate::{
    consts::RUNTIME_IMAGES_KEY,
    defaults::ClusterDefaults,
    registry::{RegistryError, RuntimeRegistry},
};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client as KubeClient, Error as KubeError};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("Failed to get config map {namespace}/{name}: {error}")]
    Get {
        #[source]
        error: KubeError,
        namespace: String,
        name: String,
    },
    #[error("Config map {namespace}/{name} does not exist")]
    NotFound { namespace: String, name: String },
    #[error("Config map has no {} entry", RUNTIME_IMAGES_KEY)]
    MissingRuntimeImages,
    #[error("Invalid {} entry: {0}", RUNTIME_IMAGES_KEY)]
    Registry(#[source] RegistryError),
}

/// The read-only inputs of a reconciliation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerConfig {
    pub registry: RuntimeRegistry,
    pub defaults: ClusterDefaults,
}

impl ControllerConfig {
    pub fn from_config_map(config_map: &ConfigMap) -> Result<Self, ConfigError> {
        let Some(data) = config_map.data.as_ref() else {
            return Err(ConfigError::MissingRuntimeImages);
        };

        let runtime_images = data
            .get(RUNTIME_IMAGES_KEY)
            .ok_or(ConfigError::MissingRuntimeImages)?;

        Ok(Self {
            registry: RuntimeRegistry::from_yaml(runtime_images).map_err(ConfigError::Registry)?,
            defaults: ClusterDefaults::from_config_data(data),
        })
    }
}

/// Where the configuration ConfigMap lives
#[derive(Clone)]
pub struct ConfigSource {
    api: Api<ConfigMap>,
    namespace: String,
    name: String,
}

impl ConfigSource {
    pub fn new(client: KubeClient, namespace: String, name: String) -> Self {
        Self {
            api: Api::namespaced(client, &namespace),
            namespace,
            name,
        }
    }

    pub async fn load(&self) -> Result<ControllerConfig, ConfigError> {
        tracing::debug!(namespace = %self.namespace, name = %self.name, "Loading configuration.");

        let config_map = self
            .api
            .get_opt(&self.name)
            .await
            .map_err(|error| ConfigError::Get {
                error,
                namespace: self.namespace.clone(),
                name: self.name.clone(),
            })?
            .ok_or_else(|| ConfigError::NotFound {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
            })?;

        ControllerConfig::from_config_map(&config_map)
    }
}
