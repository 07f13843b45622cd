//! Cluster connection commands: `connect`, `disconnect`, `intercept`, `leave`.

use anyhow::{Context, Result};
use clap::Parser;
use inkube_config::{ConfigError, ConfigStore, InkubeConfig};
use inkube_env::{ConnectClient, KubeVpnClient, KubectlClient};

use crate::session::{Project, snapshot_cache};
use crate::styled_output::{print_error, print_success};

/// Connect command.
#[derive(Debug, Parser)]
pub struct ConnectCli {}

/// Disconnect command.
#[derive(Debug, Parser)]
pub struct DisconnectCli {}

/// Intercept command.
#[derive(Debug, Parser)]
pub struct InterceptCli {}

/// Leave command.
#[derive(Debug, Parser)]
pub struct LeaveCli {}

fn with_client<F>(f: F) -> Result<()>
where
    F: FnOnce(&KubeVpnClient<&KubectlClient>, &ConfigStore, InkubeConfig) -> Result<()>,
{
    let project = Project::current()?;
    let config = project.load()?;
    let cluster = KubectlClient::new();
    let client = KubeVpnClient::new(&cluster).with_cache(snapshot_cache()?);
    f(&client, &project.store, config)
}

impl ConnectCli {
    pub fn run(self) -> Result<()> {
        with_client(|client, _, config| connect(client, &config))
    }
}

impl DisconnectCli {
    pub fn run(self) -> Result<()> {
        with_client(|client, _, config| disconnect(client, &config))
    }
}

impl InterceptCli {
    pub fn run(self) -> Result<()> {
        with_client(|client, store, config| intercept(client, store, config))
    }
}

impl LeaveCli {
    pub fn run(self) -> Result<()> {
        with_client(|client, store, config| leave(client, store, config))
    }
}

/// Connect to the configured namespace.
pub fn connect<C: ConnectClient>(client: C, config: &InkubeConfig) -> Result<()> {
    if config.namespace.is_empty() {
        return Err(ConfigError::MissingField { field: "namespace" }.into());
    }
    client
        .connect(&config.namespace)
        .with_context(|| format!("failed to connect to namespace {}", config.namespace))?;
    print_success(&format!("connected to namespace {}", config.namespace));
    Ok(())
}

/// Leave an active intercept, then disconnect.
///
/// A failed leave is reported and does not stop the disconnect.
pub fn disconnect<C: ConnectClient>(client: C, config: &InkubeConfig) -> Result<()> {
    if config.bridge.intercept
        && !config.bridge.name.is_empty()
        && let Err(e) = client.leave(&config.bridge.name, &config.namespace)
    {
        print_error(&format!("failed to leave intercept of {}: {e}", config.bridge.name));
    }
    client.disconnect().context("failed to disconnect")?;
    print_success("disconnected from cluster");
    Ok(())
}

/// Record the intercept in the config and start it.
pub fn intercept<C: ConnectClient>(
    client: C,
    store: &ConfigStore,
    mut config: InkubeConfig,
) -> Result<()> {
    config.target()?;
    config.bridge.intercept = true;
    store.save(&config)?;
    client
        .intercept(&config.bridge.name, &config.namespace)
        .with_context(|| format!("failed to intercept {}", config.bridge.name))?;
    print_success(&format!("traffic of {} is routed to this machine", config.bridge.name));
    Ok(())
}

/// Close the intercept and clear it from the config.
pub fn leave<C: ConnectClient>(client: C, store: &ConfigStore, mut config: InkubeConfig) -> Result<()> {
    config.target()?;
    client
        .leave(&config.bridge.name, &config.namespace)
        .with_context(|| format!("failed to leave intercept of {}", config.bridge.name))?;
    config.bridge.intercept = false;
    store.save(&config)?;
    print_success(&format!("left intercept of {}", config.bridge.name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use inkube_env::{ConnectError, ConnectivityStatus};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeConnect {
        calls: RefCell<Vec<String>>,
        fail_leave: bool,
    }

    impl ConnectClient for FakeConnect {
        fn connect(&self, namespace: &str) -> Result<(), ConnectError> {
            self.calls.borrow_mut().push(format!("connect {namespace}"));
            Ok(())
        }

        fn disconnect(&self) -> Result<(), ConnectError> {
            self.calls.borrow_mut().push("disconnect".into());
            Ok(())
        }

        fn intercept(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
            self.calls.borrow_mut().push(format!("intercept {workload} {namespace}"));
            Ok(())
        }

        fn leave(&self, workload: &str, namespace: &str) -> Result<(), ConnectError> {
            self.calls.borrow_mut().push(format!("leave {workload} {namespace}"));
            if self.fail_leave {
                return Err(ConnectError::NoActiveSession);
            }
            Ok(())
        }

        fn status(&self) -> Result<ConnectivityStatus, ConnectError> {
            Ok(ConnectivityStatus::default())
        }
    }

    fn configured() -> InkubeConfig {
        let mut cfg = InkubeConfig::default();
        cfg.namespace = "dev".into();
        cfg.bridge.name = "api".into();
        cfg.load_env.container = "app".into();
        cfg
    }

    #[test]
    fn test_connect_requires_namespace() {
        let client = FakeConnect::default();
        let err = connect(&client, &InkubeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("namespace is not set"));
        assert!(client.calls.borrow().is_empty());

        connect(&client, &configured()).unwrap();
        assert_eq!(*client.calls.borrow(), vec!["connect dev"]);
    }

    #[test]
    fn test_intercept_then_leave_updates_config() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        let client = FakeConnect::default();

        intercept(&client, &store, configured()).unwrap();
        assert!(store.load().unwrap().bridge.intercept);

        leave(&client, &store, store.load().unwrap()).unwrap();
        assert!(!store.load().unwrap().bridge.intercept);
        assert_eq!(*client.calls.borrow(), vec!["intercept api dev", "leave api dev"]);
    }

    #[test]
    fn test_intercept_requires_target() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        let client = FakeConnect::default();
        let mut cfg = configured();
        cfg.load_env.container.clear();

        let err = intercept(&client, &store, cfg).unwrap_err();
        assert!(err.to_string().contains("container is not set"));
        assert!(!store.exists());
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn test_disconnect_leaves_intercept_first() {
        let client = FakeConnect::default();
        let mut cfg = configured();
        cfg.bridge.intercept = true;
        disconnect(&client, &cfg).unwrap();
        assert_eq!(*client.calls.borrow(), vec!["leave api dev", "disconnect"]);
    }

    #[test]
    fn test_failed_leave_still_disconnects() {
        let client = FakeConnect {
            fail_leave: true,
            ..Default::default()
        };
        let mut cfg = configured();
        cfg.bridge.intercept = true;
        disconnect(&client, &cfg).unwrap();
        assert_eq!(*client.calls.borrow(), vec!["leave api dev", "disconnect"]);
    }
}
