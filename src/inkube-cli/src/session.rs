//! Wiring shared by the commands: project config, cache, collaborators and
//! the composition of a session environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inkube_config::{ConfigStore, InkubeConfig, Target};
use inkube_env::{
    ClusterApi, ConnectClient, EnvSnapshot, EnvTarget, PackageEnvProvider, Resolver,
    SnapshotCache, compose,
};
use tracing::{debug, warn};

use crate::styled_output::print_error;

/// The project a command runs in: its directory and `inkube.yaml`.
#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub store: ConfigStore,
}

impl Project {
    /// The project rooted at the current directory.
    pub fn current() -> Result<Self> {
        let dir = std::env::current_dir().context("failed to read current directory")?;
        Ok(Self::at(dir))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            store: ConfigStore::in_dir(&dir),
            dir,
        }
    }

    pub fn load(&self) -> Result<InkubeConfig> {
        Ok(self.store.load()?)
    }
}

/// Open the snapshot cache in the application cache directory.
pub fn snapshot_cache() -> Result<SnapshotCache> {
    let dirs = inkube_common::get_app_dirs().context("could not determine a cache directory")?;
    let dir = dirs
        .ensure_cache_dir()
        .with_context(|| format!("failed to create {}", dirs.cache_dir.display()))?;
    Ok(SnapshotCache::new(dir))
}

/// A composed session environment.
#[derive(Debug, Clone)]
pub struct ComposedEnv {
    pub env: EnvSnapshot,
    /// Capture time of the cluster variables when they came from the cache.
    pub cached_at: Option<DateTime<Utc>>,
}

/// Build the variables a session adds to the caller's environment.
///
/// Cluster variables and config overrides are loaded only when env loading
/// is enabled; the package environment only when a provider is given.
pub fn compose_session_env<C, P>(
    config: &InkubeConfig,
    target: &Target,
    cluster: C,
    cache: &SnapshotCache,
    package: Option<P>,
    refetch: bool,
    current_path: Option<&str>,
) -> Result<ComposedEnv>
where
    C: ClusterApi,
    P: PackageEnvProvider,
{
    let mut resolved = EnvSnapshot::new();
    let mut cached_at = None;
    let mut overrides = BTreeMap::new();

    if config.load_env.enabled {
        let env_target = EnvTarget::new(&target.namespace, &target.workload, &target.container);
        let cached = Resolver::new(cluster)
            .resolve_cached(cache, &env_target, refetch)
            .with_context(|| format!("failed to load env vars of {env_target}"))?;
        if cached.from_cache {
            cached_at = Some(cached.captured_at);
        }
        resolved = cached.value;
        overrides = config.load_env.overrides.clone();
    }

    let package_env = match package {
        Some(provider) => Some(
            provider
                .shell_env()
                .context("failed to load devbox environment")?,
        ),
        None => None,
    };

    let env = compose(&resolved, &overrides, package_env.as_ref(), current_path);
    debug!(count = env.len(), from_cache = cached_at.is_some(), "Composed session environment");
    Ok(ComposedEnv { env, cached_at })
}

/// A cluster connection held open for the lifetime of a dev session.
///
/// Dropping it disconnects. A failed disconnect is reported, never fatal.
pub struct Connection<T: ConnectClient> {
    client: T,
}

impl<T: ConnectClient> Connection<T> {
    pub fn open(client: T, namespace: &str) -> Result<Self> {
        client
            .connect(namespace)
            .with_context(|| format!("failed to connect to namespace {namespace}"))?;
        Ok(Self { client })
    }
}

impl<T: ConnectClient> Drop for Connection<T> {
    fn drop(&mut self) {
        if let Err(e) = self.client.disconnect() {
            warn!(error = %e, "Failed to disconnect");
            print_error(&format!("failed to disconnect: {e}"));
        }
    }
}
