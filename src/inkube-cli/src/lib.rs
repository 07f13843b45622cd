//! inkube CLI library.
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! commands live here so they can be tested without spawning the binary.
//!
//! - `cli/` - argument structures and dispatch
//! - `*_cmd.rs` - individual command implementations
//! - `session` - wiring of config, cluster, cache and package collaborators

pub mod cli;
pub mod connect_cmd;
pub mod dev_cmd;
pub mod env_cmd;
pub mod init_cmd;
pub mod session;
pub mod status_cmd;
pub mod styled_output;

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the interrupt handler has been installed.
static HANDLER_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Set while a foreground child (the dev shell) owns the terminal.
static FOREGROUND_CHILD: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler.
///
/// Outside a dev shell an interrupt exits with the conventional status 130.
/// While a dev shell runs, the terminal delivers the same SIGINT to the
/// shell, which handles it itself, so inkube ignores it and keeps waiting.
pub fn install_interrupt_handler() {
    if HANDLER_REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    let _ = ctrlc::set_handler(move || {
        if FOREGROUND_CHILD.load(Ordering::SeqCst) {
            return;
        }
        std::process::exit(130);
    });
}

/// Marks a foreground child as running until dropped.
#[derive(Debug)]
pub struct ForegroundGuard {
    previous: bool,
}

impl ForegroundGuard {
    pub fn enter() -> Self {
        let previous = FOREGROUND_CHILD.swap(true, Ordering::SeqCst);
        Self { previous }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        FOREGROUND_CHILD.store(self.previous, Ordering::SeqCst);
    }
}

/// Whether a foreground child is currently running.
pub fn foreground_child_running() -> bool {
    FOREGROUND_CHILD.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_guard_restores_state() {
        assert!(!foreground_child_running());
        {
            let _outer = ForegroundGuard::enter();
            assert!(foreground_child_running());
            {
                let _inner = ForegroundGuard::enter();
                assert!(foreground_child_running());
            }
            assert!(foreground_child_running());
        }
        assert!(!foreground_child_running());
    }
}
