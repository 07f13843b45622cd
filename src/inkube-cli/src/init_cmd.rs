//! `inkube init` and `inkube switch`: creating and retargeting `inkube.yaml`.

use anyhow::{Context, Result, bail};
use clap::Parser;
use inkube_config::{ConfigStore, InkubeConfig};
use inkube_env::{ClusterApi, KubectlClient};
use tracing::debug;

use crate::session::Project;
use crate::styled_output::{print_info, print_success};

/// Init command.
#[derive(Debug, Parser)]
pub struct InitCli {}

impl InitCli {
    pub fn run(self) -> Result<()> {
        let project = Project::current()?;
        if init(&project.store)? {
            print_success(&format!(
                "created {}, run `inkube switch` to select a workload",
                project.store.path().display()
            ));
        } else {
            print_info(&format!("{} already exists", project.store.path().display()));
        }
        Ok(())
    }
}

/// Write the starter config unless one exists. Returns whether it was written.
pub fn init(store: &ConfigStore) -> Result<bool> {
    Ok(store.init(&InkubeConfig::starter())?)
}

/// Switch command.
#[derive(Debug, Parser)]
pub struct SwitchCli {
    /// Namespace of the workload
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Deployment to bridge and read env vars from
    #[arg(long = "deployment", short = 'd', visible_alias = "name")]
    pub deployment: Option<String>,

    /// Container whose env vars are loaded; required when the deployment has several
    #[arg(long, short = 'c')]
    pub container: Option<String>,

    /// Save without checking the deployment and container against the cluster
    #[arg(long)]
    pub no_verify: bool,
}

impl SwitchCli {
    pub fn run(self) -> Result<()> {
        let project = Project::current()?;
        let mut config = if project.store.exists() {
            project.load()?
        } else {
            InkubeConfig::starter()
        };
        if self.no_verify {
            self.apply(&mut config, None::<KubectlClient>)?;
        } else {
            self.apply(&mut config, Some(KubectlClient::new()))?;
        }
        project.store.save(&config)?;
        print_success(&format!(
            "switched to {}/{} container {}",
            config.namespace, config.bridge.name, config.load_env.container
        ));
        Ok(())
    }

    /// Update `config` from the flags, checking the result against `cluster`
    /// when one is given.
    ///
    /// Switching resets the session toggles: connect on start, env loading
    /// on, no intercept.
    pub fn apply<C: ClusterApi>(&self, config: &mut InkubeConfig, cluster: Option<C>) -> Result<()> {
        if self.namespace.is_none() && self.deployment.is_none() && self.container.is_none() {
            bail!("nothing to switch, pass --namespace, --deployment or --container");
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(deployment) = &self.deployment {
            config.bridge.name = deployment.clone();
            config.load_env.name = None;
        }
        if let Some(container) = &self.container {
            config.load_env.container = container.clone();
        }

        if let Some(cluster) = cluster {
            let workload_name = config.env_workload().to_string();
            let workload = cluster
                .get_workload(&config.namespace, &workload_name)
                .with_context(|| {
                    format!("failed to read deployment {}/{workload_name}", config.namespace)
                })?;
            let containers = &workload.spec.template.spec.containers;
            if self.container.is_none() && workload.container(&config.load_env.container).is_none() {
                match containers.as_slice() {
                    [only] => config.load_env.container = only.name.clone(),
                    _ => bail!(
                        "deployment {workload_name} has containers {}, pass --container",
                        containers.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
                    ),
                }
            } else if workload.container(&config.load_env.container).is_none() {
                bail!(
                    "container {} not found in deployment {workload_name}",
                    config.load_env.container
                );
            }
            debug!(workload = %workload_name, container = %config.load_env.container, "Verified switch target");
        }

        config.target()?;
        config.connect = true;
        config.bridge.intercept = false;
        config.load_env.enabled = true;
        Ok(())
    }
}
