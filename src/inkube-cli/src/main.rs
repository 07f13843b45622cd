//! inkube CLI - main entry point.
//!
//! Parses arguments, sets up logging and hands off to the command
//! implementations in the library crate.

use std::process::ExitCode;

use clap::Parser;

use inkube_cli::cli::{Cli, ColorMode, dispatch_command};
use inkube_cli::styled_output::print_error;

/// Environment variable selecting the log level.
const LOG_LEVEL_ENV: &str = "INKUBE_LOG_LEVEL";

fn main() -> ExitCode {
    let cli = Cli::parse();

    // SAFETY: Environment variable mutations happen early before threads spawn
    match cli.color {
        ColorMode::Never => unsafe { std::env::set_var("NO_COLOR", "1") },
        ColorMode::Always => unsafe { std::env::remove_var("NO_COLOR") },
        ColorMode::Auto => {}
    }

    inkube_cli::install_interrupt_handler();

    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    let log_level = cli.effective_log_level(env_level.as_deref());
    let filter_str = format!(
        "warn,inkube_cli={level},inkube_env={level},inkube_shell={level},inkube_config={level},inkube_common={level}",
        level = log_level.as_filter_str()
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter_str)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match dispatch_command(cli) {
        Ok(code) => code,
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
