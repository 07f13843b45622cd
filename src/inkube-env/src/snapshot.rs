//! Flat environment snapshot type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resolved environment: variable name to value.
///
/// Keys are case-sensitive and unique. Iteration, serialization and display
/// are in lexicographic key order, so two equal snapshots always serialize
/// to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvSnapshot(BTreeMap<String, String>);

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a variable, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `KEY=value` pairs in key order.
    pub fn to_pairs(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Parse `KEY=value` lines. Lines without `=` are skipped; later duplicates win.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        pairs
            .into_iter()
            .filter_map(|p| {
                p.as_ref()
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .filter(|(k, _)| !k.is_empty())
            .collect()
    }

    /// Snapshot of the current process environment (non-UTF-8 entries skipped).
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for EnvSnapshot {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for EnvSnapshot {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.0.insert(k.into(), v.into());
        }
    }
}

impl IntoIterator for EnvSnapshot {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for EnvSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (k, v) in &self.0 {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_are_sorted() {
        let env: EnvSnapshot = [("ZED", "1"), ("ALPHA", "2"), ("MID", "3")].into_iter().collect();
        assert_eq!(env.to_pairs(), vec!["ALPHA=2", "MID=3", "ZED=1"]);
        assert_eq!(env.to_string(), "ALPHA=2\nMID=3\nZED=1\n");
    }

    #[test]
    fn test_from_pairs_splits_on_first_equals() {
        let env = EnvSnapshot::from_pairs(["A=b=c", "noequals", "=empty", "B="]);
        assert_eq!(env.get("A"), Some("b=c"));
        assert_eq!(env.get("B"), Some(""));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let env: EnvSnapshot = [("B", "2"), ("A", "1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&env).unwrap(), r#"{"A":"1","B":"2"}"#);
    }

    #[test]
    fn test_extend_overwrites() {
        let mut env: EnvSnapshot = [("A", "1")].into_iter().collect();
        env.extend([("A", "2"), ("B", "3")]);
        assert_eq!(env.get("A"), Some("2"));
        assert_eq!(env.get("B"), Some("3"));
    }
}
