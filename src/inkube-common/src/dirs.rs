//! Application directories for inkube.
//!
//! The cache directory holds resolved environment snapshots and the
//! connectivity-status probe. It is resolved in this order:
//! - `INKUBE_CACHE_DIR`: explicit override
//! - `XDG_CACHE_HOME/inkube`
//! - platform cache directory (`~/.cache/inkube` on Linux, `~/Library/Caches/inkube` on macOS)

use std::path::{Path, PathBuf};

/// Application name for directory paths
pub const APP_NAME: &str = "inkube";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "INKUBE_CACHE_DIR";

/// Application directories structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    /// Directory for snapshot and status cache files
    pub cache_dir: PathBuf,
}

impl AppDirs {
    /// Get application directories from the process environment.
    pub fn new() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), ::dirs::cache_dir())
    }

    /// Resolve directories from an explicit variable lookup and platform fallback.
    ///
    /// Empty values are treated as unset. Relative overrides are resolved
    /// against the current directory so cache files never land somewhere
    /// unexpected after a `cd`.
    pub fn from_lookup<F>(lookup: F, platform_cache: Option<PathBuf>) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let cache_dir = if let Some(dir) = non_empty(CACHE_DIR_ENV) {
            absolutize(PathBuf::from(dir))
        } else if let Some(xdg) = non_empty("XDG_CACHE_HOME") {
            absolutize(PathBuf::from(xdg)).join(APP_NAME)
        } else {
            platform_cache?.join(APP_NAME)
        };

        Some(Self { cache_dir })
    }

    /// Create the cache directory if needed and return it.
    pub fn ensure_cache_dir(&self) -> std::io::Result<&Path> {
        if !self.cache_dir.exists() {
            std::fs::create_dir_all(&self.cache_dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&self.cache_dir, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        Ok(&self.cache_dir)
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_relative()
        && let Ok(cwd) = std::env::current_dir()
    {
        return cwd.join(path);
    }
    path
}

/// Get application directories (convenience function)
pub fn get_app_dirs() -> Option<AppDirs> {
    AppDirs::new()
}
