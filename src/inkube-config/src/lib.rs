//! Project configuration for inkube.
//!
//! The project document lives in `inkube.yaml` next to the code being
//! developed. It names the cluster workload whose environment a dev shell
//! should mirror and toggles the optional pieces of a session (cluster
//! connection on start, devbox packages, env loading).
//!
//! Writes merge into the document already on disk, so keys this crate does
//! not model survive a round trip.

pub mod error;
pub mod store;
pub mod types;

pub use error::{ConfigError, Result};
pub use store::{CONFIG_FILE, ConfigStore, keep_unknown_keys};
pub use types::{BridgeConfig, CONFIG_VERSION, InkubeConfig, LoadEnvConfig, Target};
