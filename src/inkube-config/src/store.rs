//! Reading and merge-writing `inkube.yaml`.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::{ConfigError, InkubeConfig, Result};

/// Configuration file name.
pub const CONFIG_FILE: &str = "inkube.yaml";

/// Handle on a project's config document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `inkube.yaml` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the document.
    pub fn load(&self) -> Result<InkubeConfig> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(InkubeConfig::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `config`, keeping what is already on disk that it does not model.
    ///
    /// Fields of [`InkubeConfig`] are written exactly as given, so a cleared
    /// option or a removed override stays removed. Keys unknown to it are
    /// carried over at any nesting depth.
    pub fn save(&self, config: &InkubeConfig) -> Result<()> {
        let mut incoming = serde_yaml::to_value(config)?;

        let merged = match std::fs::read_to_string(&self.path) {
            Ok(raw) if !raw.trim().is_empty() => {
                let existing: Value =
                    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                        path: self.path.clone(),
                        source,
                    })?;
                keep_unknown_keys(&mut incoming, &existing, &known_shape()?);
                incoming
            }
            Ok(_) => incoming,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => incoming,
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let out = serde_yaml::to_string(&merged)?;
        inkube_common::atomic_write(&self.path, out.as_bytes()).map_err(|source| {
            ConfigError::Io {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(path = %self.path.display(), "Wrote config");
        Ok(())
    }

    /// Write `initial` if no document exists. Returns whether one was created.
    pub fn init(&self, initial: &InkubeConfig) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.save(initial)?;
        Ok(true)
    }
}

/// Every key [`InkubeConfig`] can write, with optional fields filled in.
fn known_shape() -> Result<Value> {
    let mut shape = InkubeConfig::default();
    shape.load_env.name = Some(String::new());
    Ok(serde_yaml::to_value(&shape)?)
}

/// Copy into `incoming` the keys of `existing` that `shape` does not model.
///
/// Modeled struct fields are descended into. Free-form maps such as
/// `overrides`, which appear empty in the shape, belong to `incoming` whole.
pub fn keep_unknown_keys(incoming: &mut Value, existing: &Value, shape: &Value) {
    let (Value::Mapping(incoming), Value::Mapping(existing), Value::Mapping(shape)) =
        (incoming, existing, shape)
    else {
        return;
    };
    for (key, value) in existing {
        match shape.get(key) {
            None => {
                if !incoming.contains_key(key) {
                    incoming.insert(key.clone(), value.clone());
                }
            }
            Some(child @ Value::Mapping(fields)) if !fields.is_empty() => {
                if let Some(target) = incoming.get_mut(key) {
                    keep_unknown_keys(target, value, child);
                }
            }
            Some(_) => {}
        }
    }
}
