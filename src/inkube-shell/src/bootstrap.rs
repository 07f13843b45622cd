//! Launching a shell on a generated init file.
//!
//! A session gets a fresh temporary directory holding an rc file rendered
//! from the dialect's template plus copies of the dialect's auxiliary startup
//! files. The shell is started on that directory through the dialect's
//! override mechanism, so the user's own files are never modified. The
//! directory is removed once the shell exits.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use inkube_env::EnvSnapshot;
use tempfile::TempDir;
use tracing::{debug, error};

use crate::profile::ShellProfile;
use crate::template::{Template, TemplateContext};
use crate::{Result, ShellError};

/// Called once before the shell starts when the environment may be outdated.
pub type StaleStateHook = Box<dyn FnOnce()>;

/// Everything one shell invocation needs.
pub struct SessionContext {
    pub project_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub history_file: Option<PathBuf>,
    /// Complete environment of the shell process.
    pub env: EnvSnapshot,
    pub on_stale_state: Option<StaleStateHook>,
    /// Run this with `-c` instead of starting an interactive session.
    pub command: Option<String>,
}

impl SessionContext {
    pub fn new(project_dir: impl Into<PathBuf>, env: EnvSnapshot) -> Self {
        Self {
            project_dir: project_dir.into(),
            started_at: Utc::now(),
            history_file: None,
            env,
            on_stale_state: None,
            command: None,
        }
    }

    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = Some(path.into());
        self
    }

    pub fn with_stale_state_hook(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.on_stale_state = Some(Box::new(hook));
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("project_dir", &self.project_dir)
            .field("started_at", &self.started_at)
            .field("history_file", &self.history_file)
            .field("env_len", &self.env.len())
            .field("on_stale_state", &self.on_stale_state.is_some())
            .field("command", &self.command)
            .finish()
    }
}

/// Result of copying one auxiliary startup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The user has no such file.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxFileReport {
    pub name: &'static str,
    pub source: PathBuf,
    pub outcome: LinkOutcome,
}

/// How the shell process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    Code(i32),
    /// Terminated by a signal.
    Signal(Option<i32>),
}

impl ShellExit {
    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ShellExit::Code(code),
            None => ShellExit::Signal(signal_of(status)),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ShellExit::Code(0))
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// What a finished session reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub exit: ShellExit,
    pub aux_files: Vec<AuxFileReport>,
}

/// A rendered session ready to launch. Dropping it removes the init directory.
#[derive(Debug)]
pub struct PreparedSession {
    dir: TempDir,
    rc_path: PathBuf,
    binary: PathBuf,
    env: EnvSnapshot,
    args: Vec<String>,
    aux_files: Vec<AuxFileReport>,
}

impl PreparedSession {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn rc_path(&self) -> &Path {
        &self.rc_path
    }

    /// Environment of the shell process, overrides and `SHELL` included.
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn aux_files(&self) -> &[AuxFileReport] {
        &self.aux_files
    }

    /// The shell command with exactly the session environment and inherited stdio.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.env_clear()
            .envs(self.env.iter())
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// Renders, links and launches sessions for one shell profile.
#[derive(Debug, Clone)]
pub struct ShellBootstrap {
    profile: ShellProfile,
    temp_root: Option<PathBuf>,
}

impl ShellBootstrap {
    pub fn new(profile: ShellProfile) -> Self {
        Self {
            profile,
            temp_root: None,
        }
    }

    /// Create session directories under `dir` instead of the system temp dir.
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    pub fn profile(&self) -> &ShellProfile {
        &self.profile
    }

    /// Render the init file and compute the launch environment.
    pub fn prepare(&self, ctx: &SessionContext) -> Result<PreparedSession> {
        let dir = self.create_dir()?;

        let original_init = self
            .profile
            .rc_path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default();
        let rendered = Template::for_dialect(self.profile.dialect).render(&TemplateContext {
            project_dir: &ctx.project_dir,
            original_init: &original_init,
            original_init_path: self.profile.rc_path.as_deref(),
            history_file: ctx.history_file.as_deref(),
            session_start: ctx.started_at,
        })?;

        let rc_path = dir.path().join(self.profile.rc_file_name());
        std::fs::write(&rc_path, rendered).map_err(|source| ShellError::FileSystem {
            path: rc_path.clone(),
            source,
        })?;
        debug!(path = %rc_path.display(), "Wrote session init file");

        let aux_files = self.link_startup_files(dir.path());

        let overrides = self.profile.mechanism.apply(&rc_path)?;
        let mut env = ctx.env.clone();
        env.extend(overrides.env);
        env.insert("SHELL", self.profile.binary.to_string_lossy());

        let mut args = overrides.args;
        if let Some(command) = &ctx.command {
            args.push("-c".to_string());
            args.push(command.clone());
        }

        Ok(PreparedSession {
            dir,
            rc_path,
            binary: self.profile.binary.clone(),
            env,
            args,
            aux_files,
        })
    }

    /// Start a prepared session in the foreground and wait for it.
    ///
    /// Any exit of the child, including a non-zero status or a signal, is a
    /// successful outcome. Only a failure to start the shell is an error.
    pub fn launch(
        &self,
        prepared: PreparedSession,
        on_stale_state: Option<StaleStateHook>,
    ) -> Result<SessionOutcome> {
        if let Some(hook) = on_stale_state {
            hook();
        }

        debug!(
            shell = %prepared.binary.display(),
            args = ?prepared.args,
            "Executing shell"
        );
        let status = prepared
            .command()
            .status()
            .map_err(|source| ShellError::Launch {
                binary: prepared.binary.clone(),
                source,
            })?;

        let exit = ShellExit::from_status(status);
        debug!(?exit, "Shell exited");
        Ok(SessionOutcome {
            exit,
            aux_files: prepared.aux_files,
        })
    }

    /// Prepare and launch a session for `ctx`.
    pub fn run(&self, mut ctx: SessionContext) -> Result<SessionOutcome> {
        let prepared = self.prepare(&ctx)?;
        self.launch(prepared, ctx.on_stale_state.take())
    }

    fn create_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("inkube-");
        let created = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|source| ShellError::FileSystem {
            path: self
                .temp_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })
    }

    /// Copy the dialect's auxiliary startup files next to the generated rc.
    ///
    /// Copies rather than links, so edits made inside the session do not
    /// reach the user's files. Failures are logged and recorded, never fatal.
    fn link_startup_files(&self, target_dir: &Path) -> Vec<AuxFileReport> {
        let names = self.profile.dialect.auxiliary_files();
        let Some(source_dir) = self.profile.init_dir() else {
            return Vec::new();
        };

        names
            .iter()
            .map(|&name| {
                let source = source_dir.join(name);
                let outcome = if !source.exists() {
                    LinkOutcome::Skipped
                } else {
                    match std::fs::copy(&source, target_dir.join(name)) {
                        Ok(_) => LinkOutcome::Linked,
                        Err(e) => {
                            error!(
                                from = %source.display(),
                                error = %e,
                                "Error copying shell startup file"
                            );
                            LinkOutcome::Failed(e.to_string())
                        }
                    }
                };
                if outcome == LinkOutcome::Linked {
                    debug!(file = name, "Linked shell startup file");
                }
                AuxFileReport {
                    name,
                    source,
                    outcome,
                }
            })
            .collect()
    }
}

impl AuxFileReport {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, LinkOutcome::Failed(_))
    }
}
