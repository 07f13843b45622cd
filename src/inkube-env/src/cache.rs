//! Key-addressed snapshot cache.
//!
//! Each key maps to one file in the cache directory holding a JSON
//! [`CacheEntry`]: the payload plus the time it was captured. Secret
//! snapshots never expire on their own and are replaced only by a refetch.
//! The connectivity-status entry expires after [`STATUS_TTL`].
//!
//! Entries are replaced by atomic rename, so a reader sees either the old or
//! the new entry, and a failed computation leaves the previous entry in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::CacheError;

/// Lifetime of a cached connectivity-status probe.
pub const STATUS_TTL: Duration = Duration::from_secs(10);

const STATUS_FILE: &str = "connectivity-status.json";

/// Identity of a container whose environment is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvTarget {
    pub namespace: String,
    pub workload: String,
    pub container: String,
}

impl EnvTarget {
    pub fn new(
        namespace: impl Into<String>,
        workload: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            workload: workload.into(),
            container: container.into(),
        }
    }
}

impl std::fmt::Display for EnvTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.workload, self.container)
    }
}

/// Address of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Resolved environment of one container. No expiry.
    Secret(EnvTarget),
    /// The single, global connectivity-status probe.
    ConnectivityStatus,
}

impl CacheKey {
    pub fn secret(target: &EnvTarget) -> Self {
        CacheKey::Secret(target.clone())
    }

    /// File name of this entry inside the cache directory.
    ///
    /// Secret keys are hashed so that names containing separators can't
    /// collide or escape the directory.
    pub fn file_name(&self) -> String {
        match self {
            CacheKey::Secret(t) => {
                let mut hasher = Sha256::new();
                hasher.update(t.namespace.as_bytes());
                hasher.update([0]);
                hasher.update(t.workload.as_bytes());
                hasher.update([0]);
                hasher.update(t.container.as_bytes());
                format!("secret-{}.cache", hex::encode(hasher.finalize()))
            }
            CacheKey::ConnectivityStatus => STATUS_FILE.to_string(),
        }
    }

    /// Longest time an entry for this key stays fresh; `None` never expires.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CacheKey::Secret(_) => None,
            CacheKey::ConnectivityStatus => Some(STATUS_TTL),
        }
    }
}

/// On-disk form of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub captured_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is younger than `max_age`. Entries from the future are stale.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        (Utc::now() - self.captured_at)
            .to_std()
            .map(|age| age < max_age)
            .unwrap_or(false)
    }
}

/// A value returned through the cache.
#[derive(Debug)]
pub struct Cached<T> {
    pub value: T,
    /// `true` when served from disk without running the live path.
    pub from_cache: bool,
    pub captured_at: DateTime<Utc>,
    /// Set when a fresh value could not be persisted.
    pub persist_error: Option<CacheError>,
}

/// File-per-key cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Read an entry. Missing, unreadable and corrupt entries are all `None`.
    pub fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let path = self.path_for(key);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Persist `value` under `key`, returning the capture time written.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<DateTime<Utc>, CacheError> {
        let captured_at = Utc::now();
        let entry = CacheEntry {
            payload: value,
            captured_at,
        };
        let bytes = serde_json::to_vec(&entry)?;
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| inkube_common::atomic_write(&path, &bytes))
            .map_err(|source| CacheError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Wrote cache entry");
        Ok(captured_at)
    }

    /// Return the cached value for `key`, or compute and persist a fresh one.
    ///
    /// With `force_refresh` the live path always runs. Otherwise a readable
    /// entry is returned as-is while it is younger than the key's TTL.
    /// `max_age` can only shorten that TTL; keys without one ignore it.
    /// `compute` errors propagate and leave the stored entry untouched; a
    /// failure to persist the fresh value is logged and reported on the
    /// result instead.
    pub fn get<T, E, F>(
        &self,
        key: &CacheKey,
        max_age: Option<Duration>,
        force_refresh: bool,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if !force_refresh && let Some(entry) = self.read::<T>(key) {
            let fresh = match key.ttl() {
                Some(ttl) => entry.is_fresh(max_age.map_or(ttl, |m| m.min(ttl))),
                None => true,
            };
            if fresh {
                debug!(key = %key.file_name(), "Cache hit");
                return Ok(Cached {
                    value: entry.payload,
                    from_cache: true,
                    captured_at: entry.captured_at,
                    persist_error: None,
                });
            }
        }

        let value = compute()?;
        let (captured_at, persist_error) = match self.put(key, &value) {
            Ok(at) => (at, None),
            Err(e) => {
                warn!(error = %e, "Failed to write cache entry");
                (Utc::now(), Some(e))
            }
        };
        Ok(Cached {
            value,
            from_cache: false,
            captured_at,
            persist_error,
        })
    }

    /// Delete the entry for `key`, if any.
    pub fn invalidate(&self, key: &CacheKey) -> std::io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;
    use tempfile::TempDir;

    fn target() -> EnvTarget {
        EnvTarget::new("dev", "api", "app")
    }

    #[test]
    fn test_secret_file_names_do_not_collide() {
        let a = CacheKey::secret(&EnvTarget::new("a-b", "c", "d")).file_name();
        let b = CacheKey::secret(&EnvTarget::new("a", "b-c", "d")).file_name();
        assert_ne!(a, b);
        assert!(a.starts_with("secret-") && a.ends_with(".cache"));
        assert!(!CacheKey::secret(&EnvTarget::new("../x", "y", "z")).file_name().contains('/'));
    }

    #[test]
    fn test_get_computes_then_hits() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::secret(&target());
        let calls = Cell::new(0);

        let first = cache
            .get(&key, None, false, || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>("v1".to_string())
            })
            .unwrap();
        assert!(!first.from_cache);
        assert!(first.persist_error.is_none());

        let second = cache
            .get(&key, None, false, || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>("v2".to_string())
            })
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(second.value, "v1");
        assert_eq!(second.captured_at, first.captured_at);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_secret_entries_ignore_max_age() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::secret(&target());
        let old = CacheEntry {
            payload: "old".to_string(),
            captured_at: Utc::now() - chrono::Duration::days(30),
        };
        std::fs::write(cache.path_for(&key), serde_json::to_vec(&old).unwrap()).unwrap();

        let got = cache
            .get(&key, Some(Duration::from_secs(1)), false, || {
                Ok::<_, Infallible>("new".to_string())
            })
            .unwrap();
        assert!(got.from_cache);
        assert_eq!(got.value, "old");
    }

    #[test]
    fn test_status_entry_expires() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::ConnectivityStatus;
        let old = CacheEntry {
            payload: "old".to_string(),
            captured_at: Utc::now() - chrono::Duration::seconds(11),
        };
        std::fs::write(cache.path_for(&key), serde_json::to_vec(&old).unwrap()).unwrap();

        let got = cache
            .get(&key, Some(STATUS_TTL), false, || {
                Ok::<_, Infallible>("new".to_string())
            })
            .unwrap();
        assert!(!got.from_cache);
        assert_eq!(got.value, "new");
    }

    #[test]
    fn test_status_ttl_holds_without_caller_max_age() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::ConnectivityStatus;
        assert_eq!(key.ttl(), Some(STATUS_TTL));
        let old = CacheEntry {
            payload: "old".to_string(),
            captured_at: Utc::now() - chrono::Duration::seconds(11),
        };
        std::fs::write(cache.path_for(&key), serde_json::to_vec(&old).unwrap()).unwrap();

        // Neither a missing nor a longer max_age stretches the TTL.
        for max_age in [None, Some(Duration::from_secs(3600))] {
            let got = cache
                .get(&key, max_age, false, || Ok::<_, Infallible>("new".to_string()))
                .unwrap();
            assert!(!got.from_cache);
            std::fs::write(cache.path_for(&key), serde_json::to_vec(&old).unwrap()).unwrap();
        }

        // A fresh entry is served within the TTL.
        cache.put(&key, &"fresh".to_string()).unwrap();
        let got = cache
            .get(&key, None, false, || Ok::<_, Infallible>("new".to_string()))
            .unwrap();
        assert!(got.from_cache);
        assert_eq!(got.value, "fresh");
    }

    #[test]
    fn test_force_refresh_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::secret(&target());
        cache.put(&key, &"old".to_string()).unwrap();

        let got = cache
            .get(&key, None, true, || Ok::<_, Infallible>("new".to_string()))
            .unwrap();
        assert!(!got.from_cache);
        assert_eq!(cache.read::<String>(&key).unwrap().payload, "new");
    }

    #[test]
    fn test_compute_failure_keeps_previous_entry() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::secret(&target());
        cache.put(&key, &"old".to_string()).unwrap();

        let err = cache
            .get::<String, _, _>(&key, None, true, || Err("boom"))
            .unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(cache.read::<String>(&key).unwrap().payload, "old");
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let key = CacheKey::secret(&target());
        std::fs::write(cache.path_for(&key), b"{not json").unwrap();

        assert!(cache.read::<String>(&key).is_none());
        let got = cache
            .get(&key, None, false, || Ok::<_, Infallible>("fresh".to_string()))
            .unwrap();
        assert!(!got.from_cache);
        assert_eq!(got.value, "fresh");
    }

    #[test]
    fn test_write_failure_still_returns_value() {
        let dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("cache");
        std::fs::write(&blocker, b"").unwrap();
        let cache = SnapshotCache::new(&blocker);

        let got = cache
            .get(&CacheKey::ConnectivityStatus, Some(STATUS_TTL), false, || {
                Ok::<_, Infallible>(42u32)
            })
            .unwrap();
        assert_eq!(got.value, 42);
        assert!(matches!(got.persist_error, Some(CacheError::WriteFailed { .. })));
    }

    #[test]
    fn test_invalidate_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.invalidate(&CacheKey::ConnectivityStatus).unwrap();
    }
}
