//! Cluster API seam and its `kubectl`-backed implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use inkube_common::{ProcessError, command_timeout, run_with_timeout};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ClusterError;
use crate::workload::{ConfigMapData, SecretData, Workload};

/// Read access to the cluster objects env resolution needs.
///
/// Every call is blocking and bounded by the implementation's deadline.
pub trait ClusterApi {
    fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClusterError>;

    fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError>;

    /// Secret data, decoded from its wire encoding.
    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, ClusterError>;

    /// Create `namespace` if it does not exist.
    fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError>;

    /// Name of the cluster the active kube context points at.
    fn current_cluster(&self) -> Result<String, ClusterError>;
}

impl<T: ClusterApi + ?Sized> ClusterApi for &T {
    fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClusterError> {
        (**self).get_workload(namespace, name)
    }

    fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        (**self).get_config_map(namespace, name)
    }

    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, ClusterError> {
        (**self).get_secret(namespace, name)
    }

    fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError> {
        (**self).ensure_namespace(namespace)
    }

    fn current_cluster(&self) -> Result<String, ClusterError> {
        (**self).current_cluster()
    }
}

/// [`ClusterApi`] over the `kubectl` binary and the user's kubeconfig.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlClient {
    /// Client using `kubectl` from `PATH` and the configured deadline.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("kubectl"),
            timeout: command_timeout(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, ProcessError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        run_with_timeout(cmd, self.timeout)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        namespace: &str,
        name: &str,
    ) -> Result<T, ClusterError> {
        debug!(kind, namespace, name, "Fetching cluster object");
        let out = self
            .run(&["get", kind, name, "-n", namespace, "-o", "json"])
            .map_err(|e| classify(kind, name, e))?;
        serde_json::from_slice(&out)
            .map_err(|e| ClusterError::InvalidResponse(format!("{kind} {namespace}/{name}: {e}")))
    }
}

impl ClusterApi for KubectlClient {
    fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClusterError> {
        self.get_json("deployment", namespace, name)
    }

    fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        let cm: ConfigMapData = self.get_json("configmap", namespace, name)?;
        Ok(cm.data)
    }

    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, ClusterError> {
        let secret: SecretData = self.get_json("secret", namespace, name)?;
        decode_secret_data(secret.data)
            .map_err(|e| ClusterError::InvalidResponse(format!("secret {namespace}/{name}: {e}")))
    }

    fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError> {
        match self.run(&["get", "namespace", namespace, "-o", "name"]) {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                info!(namespace, "Creating namespace");
                self.run(&["create", "namespace", namespace])?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn current_cluster(&self) -> Result<String, ClusterError> {
        let out = self.run(&[
            "config",
            "view",
            "--minify",
            "-o",
            "jsonpath={.contexts[0].context.cluster}",
        ])?;
        let name = String::from_utf8_lossy(&out).trim().to_string();
        if name.is_empty() {
            return Err(ClusterError::Other("no current context found".to_string()));
        }
        Ok(name)
    }
}

/// Decode base64 secret values.
pub fn decode_secret_data(
    data: BTreeMap<String, String>,
) -> Result<BTreeMap<String, Vec<u8>>, base64::DecodeError> {
    data.into_iter()
        .map(|(k, v)| BASE64.decode(v.trim()).map(|bytes| (k, bytes)))
        .collect()
}

fn is_not_found(err: &ProcessError) -> bool {
    let stderr = err.stderr();
    stderr.contains("NotFound") || stderr.contains("not found")
}

fn classify(kind: &'static str, name: &str, err: ProcessError) -> ClusterError {
    if is_not_found(&err) {
        ClusterError::NotFound {
            kind,
            name: name.to_string(),
        }
    } else {
        ClusterError::Command(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_secret_data() {
        let mut data = BTreeMap::new();
        data.insert("user".to_string(), "YWRtaW4=".to_string());
        data.insert("empty".to_string(), String::new());
        let decoded = decode_secret_data(data).unwrap();
        assert_eq!(decoded["user"], b"admin");
        assert!(decoded["empty"].is_empty());
    }

    #[test]
    fn test_decode_secret_data_rejects_garbage() {
        let mut data = BTreeMap::new();
        data.insert("bad".to_string(), "!!not base64!!".to_string());
        assert!(decode_secret_data(data).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_binary_is_command_error() {
        let client = KubectlClient::new().with_binary("/nonexistent/kubectl");
        let err = client.get_workload("dev", "api").unwrap_err();
        assert!(matches!(err, ClusterError::Command(ProcessError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_not_found_is_classified() {
        use std::os::unix::process::ExitStatusExt;
        let err = ProcessError::Failed {
            program: "kubectl get deployment api".into(),
            status: std::process::ExitStatus::from_raw(256),
            stderr: "Error from server (NotFound): deployments.apps \"api\" not found".into(),
        };
        assert!(matches!(
            classify("deployment", "api", err),
            ClusterError::NotFound { kind: "deployment", .. }
        ));

        let err = ProcessError::Failed {
            program: "kubectl get deployment api".into(),
            status: std::process::ExitStatus::from_raw(256),
            stderr: "Unable to connect to the server".into(),
        };
        assert!(matches!(classify("deployment", "api", err), ClusterError::Command(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_secret_is_decoded_from_kubectl_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("kubectl");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"kind\":\"Secret\",\"data\":{\"token\":\"czNjcjN0\"}}'\n",
        )
        .unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let client = KubectlClient::new().with_binary(&script);
        let secret = client.get_secret("dev", "creds").unwrap();
        assert_eq!(secret["token"], b"s3cr3t");
    }
}
