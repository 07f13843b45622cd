//! Composition of the final session environment.

use std::collections::BTreeMap;

use crate::snapshot::EnvSnapshot;

/// Name of the marker variable set in every inkube session.
pub const MARKER_KEY: &str = "INKUBE";

/// Value of [`MARKER_KEY`].
pub const MARKER_VALUE: &str = "true";

/// Separator between `PATH` entries on this platform.
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Merge the environment sources of a session.
///
/// Precedence, lowest to highest: `resolved` cluster variables, `overrides`
/// from the config, then the `package` manager environment. A `PATH` coming
/// from the package environment is appended to `current_path` instead of
/// replacing it. The marker variable is set last.
pub fn compose(
    resolved: &EnvSnapshot,
    overrides: &BTreeMap<String, String>,
    package: Option<&EnvSnapshot>,
    current_path: Option<&str>,
) -> EnvSnapshot {
    let mut env = resolved.clone();
    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(package) = package {
        for (key, value) in package.iter() {
            if key == "PATH" {
                env.insert(key, append_path(current_path, value));
            } else {
                env.insert(key, value);
            }
        }
    }

    env.insert(MARKER_KEY, MARKER_VALUE);
    env
}

/// The environment a session shell starts with: this process's environment
/// overlaid with `composed`.
pub fn session_environment(composed: &EnvSnapshot) -> EnvSnapshot {
    let mut env = EnvSnapshot::from_process();
    env.extend(composed.iter());
    env
}

/// `current` followed by `incoming`; `incoming` alone when `current` is empty.
pub fn append_path(current: Option<&str>, incoming: &str) -> String {
    match current {
        Some(current) if !current.is_empty() => format!("{current}{PATH_SEPARATOR}{incoming}"),
        _ => incoming.to_string(),
    }
}
