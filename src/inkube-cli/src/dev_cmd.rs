//! `inkube dev`: a shell with the cluster connection, packages and the env
//! vars of the deployed app.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use inkube_env::{DevboxProvider, KubeVpnClient, KubectlClient, session_environment};
use inkube_shell::{
    EnvOptions, SessionContext, SessionOutcome, ShellBootstrap, ShellEnvironment, ShellExit,
    ShellProfile,
};
use tracing::info;

use crate::ForegroundGuard;
use crate::session::{Connection, Project, compose_session_env, snapshot_cache};
use crate::styled_output::{print_session, print_warning};

/// Dev shell command.
#[derive(Debug, Parser)]
pub struct DevCli {
    /// Refetch env vars from the cluster instead of using cached ones
    #[arg(long, short = 'r')]
    pub refetch: bool,

    /// Run a command in the session shell instead of an interactive session
    #[arg(long = "command", short = 'c', value_name = "CMD")]
    pub command: Option<String>,
}

impl DevCli {
    pub fn run(self) -> Result<ExitCode> {
        let project = Project::current()?;
        let config = project.load()?;
        let target = config.target()?;

        let cache = snapshot_cache()?;
        let cluster = KubectlClient::new();
        let connect = KubeVpnClient::new(&cluster).with_cache(cache.clone());

        let _connection = if config.connect {
            Some(Connection::open(&connect, &config.namespace)?)
        } else {
            None
        };

        let devbox = config.devbox.then(|| DevboxProvider::new(&project.dir));
        let current_path = std::env::var("PATH").ok();
        let composed = compose_session_env(
            &config,
            &target,
            &cluster,
            &cache,
            devbox.as_ref(),
            self.refetch,
            current_path.as_deref(),
        )?;

        let profile = ShellProfile::resolve(&EnvOptions::default(), &ShellEnvironment::from_process())
            .context("cannot start a dev shell")?;

        let mut ctx = SessionContext::new(&project.dir, session_environment(&composed.env));
        if let Some(command) = self.command.clone() {
            ctx = ctx.with_command(command);
        }
        if let Some(captured_at) = composed.cached_at {
            ctx = ctx.with_stale_state_hook(move || {
                print_warning(&format!(
                    "using env vars cached at {}, run `inkube dev --refetch` to reload them",
                    captured_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            });
        }

        print_session("entering inkube shell");
        let outcome = {
            let _foreground = ForegroundGuard::enter();
            ShellBootstrap::new(profile).run(ctx)?
        };
        report_aux_files(&outcome);
        print_session("exited from inkube shell");
        info!(exit = ?outcome.exit, "Dev session ended");

        Ok(ExitCode::from(self.exit_status(outcome.exit)))
    }

    /// Interactive sessions always succeed; a `-c` command passes its status through.
    fn exit_status(&self, exit: ShellExit) -> u8 {
        if self.command.is_none() {
            return 0;
        }
        match exit {
            ShellExit::Code(code) => u8::try_from(code).unwrap_or(1),
            ShellExit::Signal(_) => 1,
        }
    }
}

fn report_aux_files(outcome: &SessionOutcome) {
    for report in outcome.aux_files.iter().filter(|r| r.failed()) {
        print_warning(&format!(
            "could not link {} into the session: {:?}",
            report.source.display(),
            report.outcome
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(command: Option<&str>) -> DevCli {
        DevCli {
            refetch: false,
            command: command.map(str::to_string),
        }
    }

    #[test]
    fn test_interactive_session_exit_is_success() {
        assert_eq!(dev(None).exit_status(ShellExit::Code(7)), 0);
        assert_eq!(dev(None).exit_status(ShellExit::Signal(Some(9))), 0);
    }

    #[test]
    fn test_command_status_is_passed_through() {
        assert_eq!(dev(Some("true")).exit_status(ShellExit::Code(0)), 0);
        assert_eq!(dev(Some("false")).exit_status(ShellExit::Code(3)), 3);
        assert_eq!(dev(Some("x")).exit_status(ShellExit::Code(300)), 1);
        assert_eq!(dev(Some("x")).exit_status(ShellExit::Signal(None)), 1);
    }
}
