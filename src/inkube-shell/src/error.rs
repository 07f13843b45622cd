//! Error types for inkube-shell.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for shell bootstrap operations.
pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("SHELL is undefined and no usable shell could be determined")]
    NoRecognizableShell,

    #[error("failed to render shell init file: {0}")]
    TemplateRenderFailed(String),

    #[error("failed to write {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start shell {}: {source}", .binary.display())]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
