use crate::{
    config::ConfigError,
    reconciler::{DeleteError, EnsureError},
};
use kube::runtime::finalizer::Error as FinalizerError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ReconcileError {
    #[error("Resource has no namespace.")]
    Namespace,
    #[error("Finalizer error: {0}")]
    FinalizeError(#[source] Box<FinalizerError<FinalizeError>>),
}

#[derive(ThisError, Debug)]
pub enum FinalizeError {
    #[error("Failed to apply resource: {0}")]
    Apply(#[source] ApplyError),
    #[error("Failed to cleanup resource: {0}")]
    Cleanup(#[source] CleanupError),
}

#[derive(ThisError, Debug)]
pub enum ApplyError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ConfigError),
    #[error("Failed to ensure objects: {0}")]
    Ensure(#[source] EnsureError),
}

#[derive(ThisError, Debug)]
pub enum CleanupError {
    #[error("Failed to delete objects: {0}")]
    Delete(#[source] DeleteError),
}
