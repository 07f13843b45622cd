//! Common utilities shared across inkube crates.

pub mod dirs;
pub mod fs;
pub mod process;

pub use dirs::{APP_NAME, AppDirs, get_app_dirs};
pub use fs::atomic_write;
pub use process::{
    DEFAULT_COMMAND_TIMEOUT, ProcessError, command_timeout, output_with_timeout, run_inherited,
    run_with_timeout,
};
