use crate::{builder::BuildError, defaults::ObjectKind, merge::MergeError};
use itertools::Itertools;
use kube::Error as KubeError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum EnsureError {
    #[error("Failed to build objects: {0}")]
    Build(#[source] BuildError),
    #[error("{0}")]
    Object(#[source] ObjectError),
}

/// A failure writing one object, with the object it concerns
#[derive(ThisError, Debug)]
#[error("{kind} {namespace}/{name}: {error}")]
pub struct ObjectError {
    #[source]
    pub error: WriteError,
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

#[derive(ThisError, Debug)]
pub enum WriteError {
    #[error("Failed to merge: {0}")]
    Merge(#[source] MergeError),
    #[error("Failed to get: {0}")]
    Get(#[source] KubeError),
    #[error("Failed to create: {0}")]
    Create(#[source] KubeError),
    #[error("Failed to update: {0}")]
    Update(#[source] KubeError),
}

#[derive(ThisError, Debug)]
#[error("{kind}: {error}")]
pub struct DeleteFailure {
    #[source]
    pub error: KubeError,
    pub kind: ObjectKind,
}

/// Every delete that failed, reported once all kinds were attempted
#[derive(ThisError, Debug)]
#[error("Failed to delete objects of {namespace}/{name}: {}", .failures.iter().join("; "))]
pub struct DeleteError {
    pub namespace: String,
    pub name: String,
    pub failures: Vec<DeleteFailure>,
}

impl DeleteError {
    pub fn kinds(&self) -> Vec<ObjectKind> {
        self.failures.iter().map(|failure| failure.kind).collect()
    }
}
