use std::cell::Cell;

use inkube_env::{CacheEntry, CacheKey, ConnectError, SnapshotCache, cached_status_output, parse_status};
use tempfile::TempDir;

const CONNECTED: &str = r#"[{"Cluster": "k3d-dev", "Status": "connected", "ProxyList": []}]"#;

fn counting_probe(calls: &Cell<usize>) -> impl FnOnce() -> Result<String, ConnectError> + '_ {
    move || {
        calls.set(calls.get() + 1);
        Ok(CONNECTED.to_string())
    }
}

#[test]
fn test_status_probe_runs_once_within_ttl() {
    let dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let calls = Cell::new(0);

    let first = cached_status_output(&cache, false, counting_probe(&calls)).unwrap();
    let second = cached_status_output(&cache, false, counting_probe(&calls)).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
    assert!(parse_status(&second, "k3d-dev").unwrap().connected);
}

#[test]
fn test_force_refresh_always_probes() {
    let dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let calls = Cell::new(0);

    cached_status_output(&cache, true, counting_probe(&calls)).unwrap();
    cached_status_output(&cache, true, counting_probe(&calls)).unwrap();
    cached_status_output(&cache, true, counting_probe(&calls)).unwrap();

    assert_eq!(calls.get(), 3);
}

#[test]
fn test_expired_status_is_probed_again() {
    let dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let stale = CacheEntry {
        payload: "[]".to_string(),
        captured_at: chrono::Utc::now() - chrono::Duration::seconds(30),
    };
    std::fs::write(
        cache.path_for(&CacheKey::ConnectivityStatus),
        serde_json::to_vec(&stale).unwrap(),
    )
    .unwrap();

    let calls = Cell::new(0);
    let raw = cached_status_output(&cache, false, counting_probe(&calls)).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(raw, CONNECTED);
}

#[test]
fn test_probe_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let err = cached_status_output(&cache, false, || Err(ConnectError::NoActiveSession)).unwrap_err();
    assert!(matches!(err, ConnectError::NoActiveSession));
    assert!(cache.read::<String>(&CacheKey::ConnectivityStatus).is_none());
}
