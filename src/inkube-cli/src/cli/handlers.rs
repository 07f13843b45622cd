//! Command dispatch.

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::args::{Cli, Commands};

/// Run the selected subcommand.
pub fn dispatch_command(cli: Cli) -> Result<ExitCode> {
    let done = match cli.command {
        Commands::Dev(dev_cli) => return dev_cli.run(),
        Commands::Init(init_cli) => init_cli.run(),
        Commands::Switch(switch_cli) => switch_cli.run(),
        Commands::Env(env_cli) => env_cli.run(),
        Commands::Status(status_cli) => status_cli.run(),
        Commands::Connect(connect_cli) => connect_cli.run(),
        Commands::Disconnect(disconnect_cli) => disconnect_cli.run(),
        Commands::Intercept(intercept_cli) => intercept_cli.run(),
        Commands::Leave(leave_cli) => leave_cli.run(),
    };
    done.map(|()| ExitCode::SUCCESS)
}
