//! `inkube env`: print the variables a dev shell would add.

use anyhow::Result;
use clap::Parser;
use inkube_env::{DevboxProvider, KubectlClient};

use crate::session::{Project, compose_session_env, snapshot_cache};
use crate::styled_output::print_info;

/// Env command.
#[derive(Debug, Parser)]
pub struct EnvCli {
    /// Refetch env vars from the cluster instead of using cached ones
    #[arg(long, short = 'r')]
    pub refetch: bool,
}

impl EnvCli {
    pub fn run(self) -> Result<()> {
        let project = Project::current()?;
        let config = project.load()?;
        let target = config.target()?;

        let cache = snapshot_cache()?;
        let devbox = config.devbox.then(|| DevboxProvider::new(&project.dir));
        let current_path = std::env::var("PATH").ok();
        let composed = compose_session_env(
            &config,
            &target,
            KubectlClient::new(),
            &cache,
            devbox.as_ref(),
            self.refetch,
            current_path.as_deref(),
        )?;

        if let Some(captured_at) = composed.cached_at {
            print_info(&format!(
                "env vars cached at {}",
                captured_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        // Snapshot iteration is ordered by key.
        print!("{}", composed.env);
        Ok(())
    }
}
