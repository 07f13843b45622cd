//! Environment resolution and composition for inkube sessions.
//!
//! The pieces, leaves first:
//!
//! - [`Resolver`] reads a workload's container spec through a [`ClusterApi`]
//!   and flattens its declared variables into an [`EnvSnapshot`].
//! - [`SnapshotCache`] persists resolved snapshots and the connectivity
//!   status probe, one file per key.
//! - [`compose`] merges resolved variables, config overrides and the package
//!   manager environment into the final session mapping.
//! - [`ConnectClient`] and [`PackageEnvProvider`] are the seams for the
//!   network bridge and the package manager.

pub mod aggregate;
pub mod cache;
pub mod cluster;
pub mod connect;
pub mod error;
pub mod package;
pub mod resolver;
pub mod snapshot;
pub mod workload;

pub use aggregate::{
    MARKER_KEY, MARKER_VALUE, PATH_SEPARATOR, append_path, compose, session_environment,
};
pub use cache::{CacheEntry, CacheKey, Cached, EnvTarget, STATUS_TTL, SnapshotCache};
pub use cluster::{ClusterApi, KubectlClient};
pub use connect::{
    ConnectClient, ConnectivityStatus, KubeVpnClient, MANAGER_NAMESPACE, cached_status_output,
    parse_status,
};
pub use error::{
    CacheError, ClusterError, ConnectError, EnvError, PackageEnvError, ReferenceKind, Result,
};
pub use package::{DevboxProvider, PackageEnvProvider, parse_env_output};
pub use resolver::Resolver;
pub use snapshot::EnvSnapshot;
pub use workload::{ContainerEnvSpec, EnvFromSource, EnvVar, Workload};
