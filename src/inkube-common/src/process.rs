//! Timeout-bounded subprocess execution.
//!
//! Cluster and connectivity collaborators are external binaries (`kubectl`,
//! `kubevpn`, `devbox`). Captured calls are bounded by a deadline; a call that
//! exceeds it is killed and reported as [`ProcessError::Timeout`], never retried.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Default deadline for a single captured command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding [`DEFAULT_COMMAND_TIMEOUT`].
pub const COMMAND_TIMEOUT_ENV: &str = "INKUBE_KUBECTL_TIMEOUT_SECS";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Captured stderr of a failed command, empty for other variants.
    pub fn stderr(&self) -> &str {
        match self {
            ProcessError::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }
}

/// Get the configured command deadline.
pub fn command_timeout() -> Duration {
    std::env::var(COMMAND_TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
}

/// Run a command with captured output, killing it after `timeout`.
///
/// Returns the output whatever the exit status; see [`run_with_timeout`]
/// for the checked variant.
pub fn output_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, ProcessError> {
    let program = program_name(&command);
    debug!(program = %program, timeout_secs = timeout.as_secs(), "Running command");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Drain pipes on their own threads so a chatty child can't block on a full pipe.
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout { program, timeout });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => return Err(ProcessError::Wait { program, source }),
        }
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
    })
}

/// Run a command with captured output; a non-zero exit is an error.
pub fn run_with_timeout(command: Command, timeout: Duration) -> Result<Vec<u8>, ProcessError> {
    let program = program_name(&command);
    let output = output_with_timeout(command, timeout)?;
    if !output.status.success() {
        return Err(ProcessError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Run a command attached to the terminal (inherited stdio, no deadline).
///
/// Used for collaborator commands that may prompt, such as privilege
/// escalation during `kubevpn connect`.
pub fn run_inherited(mut command: Command) -> Result<(), ProcessError> {
    let program = program_name(&command);
    debug!(program = %program, "Running attached command");
    let status = command.status().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !status.success() {
        return Err(ProcessError::Failed {
            program,
            status,
            stderr: String::new(),
        });
    }
    Ok(())
}

fn program_name(command: &Command) -> String {
    let mut name = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        name.push(' ');
        name.push_str(&arg.to_string_lossy());
    }
    name
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
