//! `inkube status`: connectivity of the local machine to the cluster.

use anyhow::Result;
use clap::Parser;
use inkube_env::{ConnectClient, ConnectivityStatus, KubeVpnClient, KubectlClient};
use tracing::debug;

use crate::session::snapshot_cache;
use crate::styled_output::print_info;

/// Status command.
#[derive(Debug, Parser)]
pub struct StatusCli {
    /// Print a compact marker for embedding in a shell prompt
    #[arg(long, short = 'p')]
    pub prompt: bool,
}

impl StatusCli {
    pub fn run(self) -> Result<()> {
        let cluster = KubectlClient::new();
        let mut client = KubeVpnClient::new(&cluster);
        match snapshot_cache() {
            Ok(cache) => client = client.with_cache(cache),
            Err(e) => debug!(error = %e, "Status cache unavailable"),
        }
        let status = client.status();

        if self.prompt {
            // A prompt must render even when the probe fails.
            let status = status.unwrap_or_default();
            print!("{}", prompt_marker(&status));
            return Ok(());
        }

        let status = status?;
        print_info(&describe(&status));
        Ok(())
    }
}

/// Compact marker for shell prompts.
pub fn prompt_marker(status: &ConnectivityStatus) -> String {
    let connected = if status.connected { "✅" } else { "❌" };
    let intercepted = if status.intercepted { "🕵️➡️💻" } else { "" };
    format!("{connected}(inkube){intercepted}")
}

/// Human-readable status line.
pub fn describe(status: &ConnectivityStatus) -> String {
    match (status.connected, status.intercepted) {
        (false, _) => "You are not in inkube session".to_string(),
        (true, false) => "You are connected to cluster".to_string(),
        (true, true) => "You are connected to cluster, traffic is intercepted".to_string(),
    }
}
