//! CLI argument structures.

use clap::{Parser, Subcommand};

use crate::cli::styles::{AFTER_HELP, get_styles};
use crate::connect_cmd::{ConnectCli, DisconnectCli, InterceptCli, LeaveCli};
use crate::dev_cmd::DevCli;
use crate::env_cmd::EnvCli;
use crate::init_cmd::{InitCli, SwitchCli};
use crate::status_cmd::StatusCli;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Color output mode for CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if output is a terminal
    #[default]
    Auto,
    /// Always output with colors
    Always,
    /// Never output with colors
    Never,
}

/// inkube - develop inside kubernetes
#[derive(Debug, Parser)]
#[command(name = "inkube")]
#[command(author, version)]
#[command(about = "Develop inside kubernetes", long_about = None)]
#[command(styles = get_styles(), after_help = AFTER_HELP)]
pub struct Cli {
    /// Enable verbose output (same as --log-level debug)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace-level logging for debugging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Log verbosity
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Control color output: auto (default), always, or never
    #[arg(long = "color", global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level: `--trace`, then `--verbose`, then
    /// `INKUBE_LOG_LEVEL`, then `--log-level`.
    pub fn effective_log_level(&self, env_level: Option<&str>) -> LogLevel {
        if self.trace {
            LogLevel::Trace
        } else if self.verbose {
            LogLevel::Debug
        } else if let Some(level) = env_level.and_then(LogLevel::from_str_loose) {
            level
        } else {
            self.log_level
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize inkube config in the current directory
    Init(InitCli),

    /// Point the config at a namespace, deployment and container
    #[command(visible_alias = "sw")]
    Switch(SwitchCli),

    /// Start a development shell with cluster connection, packages and the
    /// env vars of the deployed app
    Dev(DevCli),

    /// Print the composed session environment
    Env(EnvCli),

    /// Get status of the inkube session
    Status(StatusCli),

    /// Connect to the cluster network
    Connect(ConnectCli),

    /// Close the cluster connection, leaving any intercept first
    #[command(visible_alias = "quit")]
    Disconnect(DisconnectCli),

    /// Intercept the deployment and tunnel its traffic to the local machine
    Intercept(InterceptCli),

    /// Close the intercept, if active
    Leave(LeaveCli),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str_loose("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose(" trace "), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
    }

    #[test]
    fn test_effective_log_level_precedence() {
        let cli = Cli::parse_from(["inkube", "status"]);
        assert_eq!(cli.effective_log_level(None), LogLevel::Warn);
        assert_eq!(cli.effective_log_level(Some("info")), LogLevel::Info);
        assert_eq!(cli.effective_log_level(Some("bogus")), LogLevel::Warn);

        let cli = Cli::parse_from(["inkube", "-v", "status"]);
        assert_eq!(cli.effective_log_level(Some("error")), LogLevel::Debug);

        let cli = Cli::parse_from(["inkube", "status", "--trace", "-v"]);
        assert_eq!(cli.effective_log_level(None), LogLevel::Trace);
    }

    #[test]
    fn test_dev_flags() {
        let cli = Cli::parse_from(["inkube", "dev", "-r", "-c", "make test"]);
        match cli.command {
            Commands::Dev(dev) => {
                assert!(dev.refetch);
                assert_eq!(dev.command.as_deref(), Some("make test"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quit_alias_maps_to_disconnect() {
        let cli = Cli::parse_from(["inkube", "quit"]);
        assert!(matches!(cli.command, Commands::Disconnect(_)));
    }

    #[test]
    fn test_status_prompt_flag() {
        let cli = Cli::parse_from(["inkube", "status", "-p"]);
        match cli.command {
            Commands::Status(status) => assert!(status.prompt),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
