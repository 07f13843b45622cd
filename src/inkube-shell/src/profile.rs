//! Detection of the user's shell and its init file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dialect::{OverrideMechanism, ShellDialect};
use crate::{Result, ShellError};

/// Options controlling how the session environment is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOptions {
    /// Ignore the caller's environment, including `SHELL`.
    pub pure: bool,
}

/// The variables shell detection reads, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellEnvironment {
    pub shell: Option<String>,
    pub home: Option<PathBuf>,
    pub zdotdir: Option<String>,
    /// `ENV`, the POSIX shell init file.
    pub env_file: Option<String>,
    pub xdg_config_home: Option<String>,
}

impl ShellEnvironment {
    pub fn from_process() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            shell: var("SHELL"),
            home: dirs::home_dir(),
            zdotdir: var("ZDOTDIR"),
            env_file: var("ENV"),
            xdg_config_home: var("XDG_CONFIG_HOME"),
        }
    }
}

/// The shell a session runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProfile {
    pub dialect: ShellDialect,
    pub binary: PathBuf,
    /// The user's own rc file; it need not exist.
    pub rc_path: Option<PathBuf>,
    pub mechanism: OverrideMechanism,
}

impl ShellProfile {
    /// Resolve the profile from `SHELL`.
    ///
    /// Fails with [`ShellError::NoRecognizableShell`] when `SHELL` is unset or
    /// `options.pure` forbids reading it.
    pub fn resolve(options: &EnvOptions, env: &ShellEnvironment) -> Result<Self> {
        if options.pure {
            return Err(ShellError::NoRecognizableShell);
        }
        let shell = env
            .shell
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ShellError::NoRecognizableShell)?;
        let profile = Self::for_binary(shell, env);
        debug!(
            shell = %profile.binary.display(),
            dialect = %profile.dialect,
            initrc = ?profile.rc_path,
            "Detected user shell"
        );
        Ok(profile)
    }

    /// Profile for an explicit shell binary.
    pub fn for_binary(binary: impl Into<PathBuf>, env: &ShellEnvironment) -> Self {
        let binary = binary.into();
        let dialect = ShellDialect::from_path(&binary);
        Self {
            dialect,
            rc_path: user_rc_path(dialect, env),
            mechanism: dialect.override_mechanism(),
            binary,
        }
    }

    /// Base name for the generated rc file.
    pub fn rc_file_name(&self) -> String {
        self.rc_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shellrc".to_string())
    }

    /// Directory the user's startup files live in.
    pub fn init_dir(&self) -> Option<&Path> {
        self.rc_path.as_deref().and_then(Path::parent)
    }
}

fn user_rc_path(dialect: ShellDialect, env: &ShellEnvironment) -> Option<PathBuf> {
    let home = env.home.as_deref();
    match dialect {
        ShellDialect::Bash => home.map(|h| h.join(".bashrc")),
        ShellDialect::Zsh => match &env.zdotdir {
            Some(dir) => Some(PathBuf::from(dir).join(".zshrc")),
            None => home.map(|h| h.join(".zshrc")),
        },
        ShellDialect::Ksh => home.map(|h| h.join(".kshrc")),
        ShellDialect::Fish => {
            let config = match &env.xdg_config_home {
                Some(dir) => PathBuf::from(dir),
                None => home?.join(".config"),
            };
            Some(config.join("fish").join("config.fish"))
        }
        ShellDialect::Posix => match &env.env_file {
            Some(file) => Some(PathBuf::from(file)),
            None => home.map(|h| h.join(".shinit")),
        },
        ShellDialect::Unknown => None,
    }
}
