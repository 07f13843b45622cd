//! CLI styling and formatting.

use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Styled help theme.
pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

/// After-help section with quick start and environment variables.
pub const AFTER_HELP: &str = color_print::cstr!(
    r#"<cyan,bold>QUICK START</>
    <green,bold>inkube init</>                    Write a default inkube.yaml
    <green,bold>inkube switch</> <dim>-n dev -d api -c app</>  Point at a workload
    <green,bold>inkube dev</>                     Start a shell with the workload's env
    <green,bold>inkube dev --refetch</>           Same, ignoring cached env vars

<cyan,bold>ENVIRONMENT VARIABLES</>
    <yellow>INKUBE_LOG_LEVEL</>              Log verbosity (error, warn, info, debug, trace)
    <yellow>INKUBE_CACHE_DIR</>              Override the cache directory
    <yellow>INKUBE_KUBECTL_TIMEOUT_SECS</>   Deadline for each cluster call (default: 30)
    <yellow>NO_COLOR</>                      Disable colored output"#
);
