//! Styled CLI output.
//!
//! Messages go to stderr so stdout stays clean for command output such as
//! `inkube env`. Colors are used only on a terminal and never when
//! `NO_COLOR` is set.

use std::io::{IsTerminal, Write};

/// Check if colors should be disabled based on NO_COLOR env var.
fn colors_disabled() -> bool {
    std::env::var("NO_COLOR")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

mod theme {
    pub const SUCCESS: &str = "\x1b[38;2;0;245;212m";
    pub const ERROR: &str = "\x1b[38;2;255;107;107m";
    pub const WARNING: &str = "\x1b[38;2;255;200;87m";
    pub const INFO: &str = "\x1b[38;2;72;202;228m";
    pub const RESET: &str = "\x1b[0m";
}

/// Message type for styled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
    /// Session lifecycle lines (`[#] entering inkube shell`).
    Session,
}

impl MessageType {
    fn icon(&self) -> &'static str {
        match self {
            MessageType::Success => "[OK]",
            MessageType::Error => "[ERROR]",
            MessageType::Warning => "[WARN]",
            MessageType::Info => "[INFO]",
            MessageType::Session => "[#]",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            MessageType::Success => theme::SUCCESS,
            MessageType::Error => theme::ERROR,
            MessageType::Warning => theme::WARNING,
            MessageType::Info | MessageType::Session => theme::INFO,
        }
    }
}

/// Render a message, with or without ANSI colors.
pub fn format_message(msg_type: MessageType, message: &str, colored: bool) -> String {
    if colored {
        format!(
            "{}{} {}{}",
            msg_type.color(),
            msg_type.icon(),
            message,
            theme::RESET
        )
    } else {
        format!("{} {}", msg_type.icon(), message)
    }
}

fn print_styled(msg_type: MessageType, message: &str) {
    let colored = !colors_disabled() && std::io::stderr().is_terminal();
    let line = format_message(msg_type, message, colored);
    let _ = writeln!(std::io::stderr(), "{line}");
}

pub fn print_success(message: &str) {
    print_styled(MessageType::Success, message);
}

/// Print an error message to stderr.
pub fn print_error(message: &str) {
    print_styled(MessageType::Error, message);
}

pub fn print_warning(message: &str) {
    print_styled(MessageType::Warning, message);
}

pub fn print_info(message: &str) {
    print_styled(MessageType::Info, message);
}

/// Print a session lifecycle line to stderr.
pub fn print_session(message: &str) {
    print_styled(MessageType::Session, message);
}
