//! Error types for inkube-env.

use std::path::PathBuf;

use inkube_common::ProcessError;
use thiserror::Error;

/// Result type for environment resolution.
pub type Result<T> = std::result::Result<T, EnvError>;

/// Kind of cluster object an env variable points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    ConfigMap,
    Secret,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::ConfigMap => write!(f, "configmap"),
            ReferenceKind::Secret => write!(f, "secret"),
        }
    }
}

/// Errors from resolving a container's environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to fetch workload {namespace}/{workload}: {source}")]
    WorkloadFetchFailed {
        namespace: String,
        workload: String,
        #[source]
        source: ClusterError,
    },

    #[error("container {container} not found in workload {namespace}/{workload}")]
    ContainerNotFound {
        namespace: String,
        workload: String,
        container: String,
    },

    #[error("failed to resolve {kind} {namespace}/{name}: {source}")]
    ReferenceResolutionFailed {
        kind: ReferenceKind,
        namespace: String,
        name: String,
        #[source]
        source: ClusterError,
    },
}

/// Errors from the cluster API collaborator.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error(transparent)]
    Command(#[from] ProcessError),

    #[error("invalid response from cluster: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Errors from snapshot cache persistence. Never fatal to a resolution.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write cache entry {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from the connectivity client.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{binary} not found, please ensure {binary} is installed")]
    MissingDependency { binary: &'static str },

    #[error(transparent)]
    Command(#[from] ProcessError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("invalid status output: {0}")]
    InvalidStatus(#[from] serde_json::Error),

    #[error("no active sessions found")]
    NoActiveSession,
}

/// Errors from the package-manager environment provider.
#[derive(Debug, Error)]
pub enum PackageEnvError {
    #[error("{binary} not found, please ensure {binary} is installed")]
    MissingDependency { binary: &'static str },

    #[error(transparent)]
    Command(#[from] ProcessError),

    #[error("failed to stage shellenv script: {0}")]
    Io(#[from] std::io::Error),
}
