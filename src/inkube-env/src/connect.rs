//! Connectivity client seam and the kubevpn-backed implementation.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use inkube_common::{command_timeout, run_inherited, run_with_timeout};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, STATUS_TTL, SnapshotCache};
use crate::cluster::ClusterApi;
use crate::error::ConnectError;

/// Namespace kubevpn installs its traffic manager into.
pub const MANAGER_NAMESPACE: &str = "kubevpn";

/// Whether the local machine is bridged into the current cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    pub connected: bool,
    /// A workload of the current cluster is being intercepted.
    pub intercepted: bool,
}

/// Network bridge into a cluster.
pub trait ConnectClient {
    fn connect(&self, namespace: &str) -> Result<(), ConnectError>;
    fn disconnect(&self) -> Result<(), ConnectError>;
    fn intercept(&self, workload: &str, namespace: &str) -> Result<(), ConnectError>;
    fn leave(&self, workload: &str, namespace: &str) -> Result<(), ConnectError>;
    fn status(&self) -> Result<ConnectivityStatus, ConnectError>;
}

impl<T: ConnectClient + ?Sized> ConnectClient for &T {
    fn connect(&self, namespace: &str) -> Result<(), ConnectError> {
        (**self).connect(namespace)
    }

    fn disconnect(&self) -> Result<(), ConnectError> {
        (**self).disconnect()
    }

    fn intercept(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
        (**self).intercept(workload, namespace)
    }

    fn leave(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
        (**self).leave(workload, namespace)
    }

    fn status(&self) -> Result<ConnectivityStatus, ConnectError> {
        (**self).status()
    }
}

/// One entry of `kubevpn status -o json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionStatus {
    #[serde(default)]
    cluster: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    proxy_list: Vec<ProxyEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProxyEntry {
    #[serde(default)]
    cluster: String,
}

fn parse_sessions(raw: &str) -> Result<Vec<SessionStatus>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

/// Interpret `kubevpn status -o json` output for `current_cluster`.
///
/// Connected means a session for that cluster reports `connected`;
/// intercepted means that session has a proxy rule for the same cluster.
pub fn parse_status(raw: &str, current_cluster: &str) -> Result<ConnectivityStatus, ConnectError> {
    let sessions = parse_sessions(raw)?;
    let status = sessions
        .iter()
        .find(|s| s.status == "connected" && s.cluster == current_cluster)
        .map(|s| ConnectivityStatus {
            connected: true,
            intercepted: s.proxy_list.iter().any(|p| p.cluster == s.cluster),
        })
        .unwrap_or_default();
    Ok(status)
}

/// Index of the session for `current_cluster`, as `kubevpn disconnect` expects.
pub fn session_index(raw: &str, current_cluster: &str) -> Result<usize, ConnectError> {
    parse_sessions(raw)?
        .iter()
        .position(|s| s.cluster == current_cluster)
        .ok_or(ConnectError::NoActiveSession)
}

/// Raw status output through the global status cache entry.
///
/// A stored probe younger than [`STATUS_TTL`] is reused unless
/// `force_refresh` is set.
pub fn cached_status_output<F>(
    cache: &SnapshotCache,
    force_refresh: bool,
    probe: F,
) -> Result<String, ConnectError>
where
    F: FnOnce() -> Result<String, ConnectError>,
{
    let cached = cache.get(&CacheKey::ConnectivityStatus, Some(STATUS_TTL), force_refresh, probe)?;
    if cached.from_cache {
        debug!(captured_at = %cached.captured_at, "Using cached connectivity status");
    }
    Ok(cached.value)
}

/// [`ConnectClient`] that drives the `kubevpn` CLI.
#[derive(Debug, Clone)]
pub struct KubeVpnClient<C> {
    cluster: C,
    cache: Option<SnapshotCache>,
    binary: PathBuf,
    manager_namespace: String,
    timeout: Duration,
}

impl<C: ClusterApi> KubeVpnClient<C> {
    pub fn new(cluster: C) -> Self {
        Self {
            cluster,
            cache: None,
            binary: PathBuf::from("kubevpn"),
            manager_namespace: MANAGER_NAMESPACE.to_string(),
            timeout: command_timeout(),
        }
    }

    /// Route status probes through `cache`.
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Fail unless the `kubevpn` binary can be found.
    pub fn ensure_dependencies(&self) -> Result<PathBuf, ConnectError> {
        which::which(&self.binary).map_err(|_| ConnectError::MissingDependency { binary: "kubevpn" })
    }

    /// Status, bypassing the cache when `force_refresh` is set.
    pub fn status_with(&self, force_refresh: bool) -> Result<ConnectivityStatus, ConnectError> {
        let raw = match &self.cache {
            Some(cache) => cached_status_output(cache, force_refresh, || self.probe())?,
            None => self.probe()?,
        };
        let cluster = self.cluster.current_cluster()?;
        parse_status(&raw, &cluster)
    }

    fn probe(&self) -> Result<String, ConnectError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["status", "-o", "json"]);
        let out = run_with_timeout(cmd, self.timeout)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn run_attached(&self, args: &[&str]) -> Result<(), ConnectError> {
        self.ensure_dependencies()?;
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        let result = run_inherited(cmd);
        self.forget_status();
        Ok(result?)
    }

    /// Drop the cached status after a state change.
    fn forget_status(&self) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.invalidate(&CacheKey::ConnectivityStatus)
        {
            warn!(error = %e, "Failed to clear cached connectivity status");
        }
    }
}

impl<C: ClusterApi> ConnectClient for KubeVpnClient<C> {
    fn connect(&self, namespace: &str) -> Result<(), ConnectError> {
        info!(namespace, "Connecting to cluster");
        self.ensure_dependencies()?;
        self.cluster.ensure_namespace(&self.manager_namespace)?;
        let manager = format!("--manager-namespace={}", self.manager_namespace);
        self.run_attached(&["connect", "-n", namespace, &manager])
    }

    fn disconnect(&self) -> Result<(), ConnectError> {
        info!("Disconnecting from cluster");
        self.ensure_dependencies()?;
        let raw = self.probe()?;
        let cluster = self.cluster.current_cluster()?;
        let index = session_index(&raw, &cluster)?.to_string();
        self.run_attached(&["disconnect", &index])
    }

    fn intercept(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
        info!(workload, namespace, "Intercepting workload");
        let target = format!("deployment/{workload}");
        let manager = format!("--manager-namespace={}", self.manager_namespace);
        self.run_attached(&["proxy", &target, "-n", namespace, &manager])
    }

    fn leave(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
        info!(workload, namespace, "Leaving intercept");
        let target = format!("deployment/{workload}");
        self.run_attached(&["leave", &target, "-n", namespace])
    }

    fn status(&self) -> Result<ConnectivityStatus, ConnectError> {
        self.status_with(false)
    }
}
