//! Runtime registry.
//!
//! Maps a runtime family and version to the images used to build, install and
//! run a function. Parsed once from the `runtime-images` configuration entry
//! and then only read.

use k8s_openapi::api::core::v1::Probe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum RegistryError {
    #[error("Failed to parse runtime registry: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("Invalid runtime identifier: {0:?}")]
    InvalidRuntimeId(String),
    #[error("Unknown runtime family: {0}")]
    UnknownFamily(String),
    #[error("Runtime {family} has no version {version}")]
    UnknownVersion { family: String, version: String },
    #[error("Runtime {family}{version} has no {phase} image")]
    MissingImage {
        family: String,
        version: String,
        phase: ImagePhase,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ImagePhase {
    #[serde(alias = "compilation")]
    Build,
    #[serde(alias = "installation")]
    Init,
    Runtime,
}

impl std::fmt::Display for ImagePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImagePhase::Build => write!(f, "build"),
            ImagePhase::Init => write!(f, "init"),
            ImagePhase::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseImage {
    pub phase: ImagePhase,
    pub image: String,
    /// Shell command run in the image, if any
    pub command: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageSecret {
    #[serde(rename = "ImageSecret")]
    pub image_secret: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub images: Vec<PhaseImage>,
    /// Used for the init phase when `images` has no init entry
    pub init_image: Option<String>,
    #[serde(default)]
    pub image_pull_secrets: Vec<ImageSecret>,
    pub liveness_probe_info: Option<Probe>,
}

impl RuntimeVersion {
    pub fn phase_image(&self, phase: ImagePhase) -> Option<&PhaseImage> {
        self.images.iter().find(|image| image.phase == phase)
    }

    pub fn image(&self, phase: ImagePhase) -> Option<&str> {
        match (self.phase_image(phase), phase) {
            (Some(image), _) => Some(image.image.as_str()),
            (None, ImagePhase::Init) => self.init_image.as_deref(),
            (None, _) => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub dep_name: String,
    #[serde(default)]
    pub file_name_suffix: String,
    #[serde(default)]
    pub versions: Vec<RuntimeVersion>,
    /// Fallback for versions that carry no probe of their own
    pub liveness_probe_info: Option<Probe>,
}

/// A matched family and version
#[derive(Debug, Clone, Copy)]
pub struct RuntimeMatch<'a> {
    pub info: &'a RuntimeInfo,
    pub version: &'a RuntimeVersion,
}

impl<'a> RuntimeMatch<'a> {
    pub fn liveness_probe(&self) -> Option<&'a Probe> {
        self.version
            .liveness_probe_info
            .as_ref()
            .or(self.info.liveness_probe_info.as_ref())
    }

    pub fn image(&self, phase: ImagePhase) -> Result<&'a str, RegistryError> {
        self.version
            .image(phase)
            .ok_or_else(|| RegistryError::MissingImage {
                family: self.info.id.clone(),
                version: self.version.version.clone(),
                phase,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeRegistry {
    runtimes: Vec<RuntimeInfo>,
}

impl RuntimeRegistry {
    pub fn new(runtimes: Vec<RuntimeInfo>) -> Self {
        Self { runtimes }
    }

    /// Accepts YAML as well as JSON.
    pub fn from_yaml(document: &str) -> Result<Self, RegistryError> {
        let runtimes = serde_yaml::from_str(document).map_err(RegistryError::Parse)?;
        Ok(Self::new(runtimes))
    }

    pub fn lookup(&self, family: &str, version: &str) -> Result<RuntimeMatch<'_>, RegistryError> {
        let info = self
            .runtimes
            .iter()
            .find(|info| info.id == family)
            .ok_or_else(|| RegistryError::UnknownFamily(family.to_string()))?;

        let version = info
            .versions
            .iter()
            .find(|candidate| candidate.version == version)
            .ok_or_else(|| RegistryError::UnknownVersion {
                family: family.to_string(),
                version: version.to_string(),
            })?;

        Ok(RuntimeMatch { info, version })
    }

    /// Looks up a runtime identifier such as `ruby2.4`.
    pub fn lookup_runtime(&self, runtime: &str) -> Result<RuntimeMatch<'_>, RegistryError> {
        let (family, version) = split_runtime_id(runtime)?;
        self.lookup(family, version)
    }
}

/// Splits `ruby2.4` into `("ruby", "2.4")`.
pub fn split_runtime_id(runtime: &str) -> Result<(&str, &str), RegistryError> {
    let split_at = runtime
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| RegistryError::InvalidRuntimeId(runtime.to_string()))?;

    let (family, version) = runtime.split_at(split_at);
    if family.is_empty() {
        return Err(RegistryError::InvalidRuntimeId(runtime.to_string()));
    }

    Ok((family, version))
}
