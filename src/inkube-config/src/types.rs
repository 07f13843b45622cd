//! Config document model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Current document version written by `inkube init`.
pub const CONFIG_VERSION: &str = "v1";

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

/// The `inkube.yaml` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InkubeConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// Namespace of the target workload.
    #[serde(default)]
    pub namespace: String,

    /// Connect to the cluster when a dev shell starts.
    #[serde(default)]
    pub connect: bool,

    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Inject the devbox package environment into the shell.
    #[serde(default)]
    pub devbox: bool,

    #[serde(default)]
    pub load_env: LoadEnvConfig,
}

impl Default for InkubeConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            namespace: String::new(),
            connect: false,
            bridge: BridgeConfig::default(),
            devbox: false,
            load_env: LoadEnvConfig::default(),
        }
    }
}

/// Workload bridged into the local machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Deployment name.
    #[serde(default)]
    pub name: String,

    /// Intercept the workload's traffic once connected.
    #[serde(default)]
    pub intercept: bool,
}

/// Which container's environment is loaded into the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadEnvConfig {
    /// Deployment to read env from when it differs from the bridged one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub container: String,

    #[serde(default)]
    pub enabled: bool,

    /// Values that replace resolved cluster variables of the same name.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

/// Fully specified env target (namespace, workload, container).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub namespace: String,
    pub workload: String,
    pub container: String,
}

impl InkubeConfig {
    /// The document `inkube init` writes: connect on start, load env and
    /// devbox packages, with no workload selected yet.
    pub fn starter() -> Self {
        Self {
            connect: true,
            devbox: true,
            load_env: LoadEnvConfig {
                enabled: true,
                overrides: BTreeMap::from([("INKUBE".to_string(), "true".to_string())]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Name of the deployment whose env is loaded.
    pub fn env_workload(&self) -> &str {
        self.load_env.name.as_deref().unwrap_or(&self.bridge.name)
    }

    /// Validate that the workload, container and namespace are set.
    pub fn target(&self) -> Result<Target> {
        if self.bridge.name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "deployment name",
            });
        }
        if self.load_env.container.is_empty() {
            return Err(ConfigError::MissingField { field: "container" });
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingField { field: "namespace" });
        }
        Ok(Target {
            namespace: self.namespace.clone(),
            workload: self.env_workload().to_string(),
            container: self.load_env.container.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> InkubeConfig {
        let mut cfg = InkubeConfig::default();
        cfg.namespace = "dev".into();
        cfg.bridge.name = "api".into();
        cfg.load_env.container = "app".into();
        cfg
    }

    #[test]
    fn test_starter_enables_session_features() {
        let cfg = InkubeConfig::starter();
        assert!(cfg.connect);
        assert!(cfg.devbox);
        assert!(cfg.load_env.enabled);
        assert!(!cfg.bridge.intercept);
        assert_eq!(cfg.load_env.overrides.get("INKUBE").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_default_config() {
        let cfg = InkubeConfig::default();
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert!(!cfg.connect);
        assert!(!cfg.devbox);
        assert!(cfg.load_env.overrides.is_empty());
    }

    #[test]
    fn test_target_uses_bridge_name() {
        let target = configured().target().unwrap();
        assert_eq!(target.namespace, "dev");
        assert_eq!(target.workload, "api");
        assert_eq!(target.container, "app");
    }

    #[test]
    fn test_target_prefers_load_env_name() {
        let mut cfg = configured();
        cfg.load_env.name = Some("api-worker".into());
        assert_eq!(cfg.target().unwrap().workload, "api-worker");
    }

    #[test]
    fn test_target_reports_missing_fields_in_order() {
        let mut cfg = configured();
        cfg.namespace.clear();
        cfg.load_env.container.clear();
        let err = cfg.target().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "container" }));
        assert!(err.to_string().contains("inkube switch"));
    }

    #[test]
    fn test_parse_camel_case_document() {
        let yaml = "namespace: dev\nconnect: true\nbridge:\n  name: api\nloadEnv:\n  container: app\n  enabled: true\n  overrides:\n    LOG_LEVEL: debug\n";
        let cfg: InkubeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert!(cfg.connect);
        assert!(cfg.load_env.enabled);
        assert_eq!(cfg.load_env.overrides["LOG_LEVEL"], "debug");
    }
}
