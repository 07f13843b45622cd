//! Resolution of a container's declared environment into a flat snapshot.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::cache::{CacheKey, Cached, EnvTarget, SnapshotCache};
use crate::cluster::ClusterApi;
use crate::error::{ClusterError, EnvError, ReferenceKind, Result};
use crate::snapshot::EnvSnapshot;
use crate::workload::{EnvFromSource, EnvVar};

/// Resolves container environments through a [`ClusterApi`].
#[derive(Debug, Clone)]
pub struct Resolver<C> {
    cluster: C,
}

/// Objects fetched during one resolution, so repeated references hit the cluster once.
#[derive(Default)]
struct Fetched {
    config_maps: BTreeMap<String, BTreeMap<String, String>>,
    secrets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl<C: ClusterApi> Resolver<C> {
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Resolve the effective environment of `container` in `namespace/workload`.
    ///
    /// Per-variable bindings are applied in manifest order, then bulk imports
    /// in manifest order, each overwriting earlier values of the same name.
    /// Any failed fetch aborts the whole resolution.
    pub fn resolve(&self, namespace: &str, workload: &str, container: &str) -> Result<EnvSnapshot> {
        debug!(namespace, workload, container, "Resolving container environment");

        let spec = self
            .cluster
            .get_workload(namespace, workload)
            .map_err(|source| EnvError::WorkloadFetchFailed {
                namespace: namespace.to_string(),
                workload: workload.to_string(),
                source,
            })?;
        let container_spec =
            spec.container(container)
                .ok_or_else(|| EnvError::ContainerNotFound {
                    namespace: namespace.to_string(),
                    workload: workload.to_string(),
                    container: container.to_string(),
                })?;

        let mut fetched = Fetched::default();
        let mut env = EnvSnapshot::new();

        for var in &container_spec.env {
            let value = self.resolve_var(namespace, var, &mut fetched)?;
            env.insert(var.name.clone(), value);
        }

        for import in &container_spec.env_from {
            self.apply_import(namespace, import, &mut fetched, &mut env)?;
        }

        debug!(namespace, workload, container, count = env.len(), "Resolved environment");
        Ok(env)
    }

    /// [`Resolver::resolve`] behind the snapshot cache.
    ///
    /// Without `refetch`, a stored snapshot for `target` is returned as-is.
    /// A fresh snapshot is persisted only after it resolved completely.
    pub fn resolve_cached(
        &self,
        cache: &SnapshotCache,
        target: &EnvTarget,
        refetch: bool,
    ) -> Result<Cached<EnvSnapshot>> {
        let key = CacheKey::secret(target);
        let cached = cache.get(&key, None, refetch, || {
            self.resolve(&target.namespace, &target.workload, &target.container)
        })?;
        if cached.from_cache {
            info!(target = %target, captured_at = %cached.captured_at, "Using cached env vars");
        }
        Ok(cached)
    }

    fn resolve_var(&self, namespace: &str, var: &EnvVar, fetched: &mut Fetched) -> Result<String> {
        if let Some(value) = var.value.as_deref().filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }

        let Some(source) = &var.value_from else {
            return Ok(var.value.clone().unwrap_or_default());
        };

        if let Some(sel) = &source.config_map_key_ref {
            let data = self.config_map(namespace, &sel.name, fetched)?;
            return Ok(data.get(&sel.key).cloned().unwrap_or_default());
        }
        if let Some(sel) = &source.secret_key_ref {
            let data = self.secret(namespace, &sel.name, fetched)?;
            return Ok(data
                .get(&sel.key)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default());
        }
        if let Some(field) = &source.field_ref {
            return Ok(format!("fieldRef: {}", field.field_path));
        }
        if let Some(resource) = &source.resource_field_ref {
            return Ok(format!("resourceFieldRef: {}", resource.resource));
        }

        Ok(var.value.clone().unwrap_or_default())
    }

    fn apply_import(
        &self,
        namespace: &str,
        import: &EnvFromSource,
        fetched: &mut Fetched,
        env: &mut EnvSnapshot,
    ) -> Result<()> {
        if let Some(cm) = &import.config_map_ref {
            let data = self.config_map(namespace, &cm.name, fetched)?;
            env.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(secret) = &import.secret_ref {
            let data = self.secret(namespace, &secret.name, fetched)?;
            env.extend(
                data.iter()
                    .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned())),
            );
        }
        Ok(())
    }

    fn config_map<'a>(
        &self,
        namespace: &str,
        name: &str,
        fetched: &'a mut Fetched,
    ) -> Result<&'a BTreeMap<String, String>> {
        if !fetched.config_maps.contains_key(name) {
            let data = self
                .cluster
                .get_config_map(namespace, name)
                .map_err(|source| reference_failed(ReferenceKind::ConfigMap, namespace, name, source))?;
            fetched.config_maps.insert(name.to_string(), data);
        }
        Ok(&fetched.config_maps[name])
    }

    fn secret<'a>(
        &self,
        namespace: &str,
        name: &str,
        fetched: &'a mut Fetched,
    ) -> Result<&'a BTreeMap<String, Vec<u8>>> {
        if !fetched.secrets.contains_key(name) {
            let data = self
                .cluster
                .get_secret(namespace, name)
                .map_err(|source| reference_failed(ReferenceKind::Secret, namespace, name, source))?;
            fetched.secrets.insert(name.to_string(), data);
        }
        Ok(&fetched.secrets[name])
    }
}

fn reference_failed(
    kind: ReferenceKind,
    namespace: &str,
    name: &str,
    source: ClusterError,
) -> EnvError {
    EnvError::ReferenceResolutionFailed {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    }
}
