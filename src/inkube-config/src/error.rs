//! Error types for inkube-config.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while reading or writing the project config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {}, please run `inkube init` first", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("{field} is not set, please run `inkube switch` to set the app name, namespace and container")]
    MissingField { field: &'static str },
}
