//! Package-manager environment seam and the devbox provider.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use inkube_common::{run_inherited, run_with_timeout};
use tracing::{debug, info};

use crate::error::PackageEnvError;
use crate::snapshot::EnvSnapshot;

/// Supplies the environment a package manager would set up for a project.
pub trait PackageEnvProvider {
    fn shell_env(&self) -> Result<EnvSnapshot, PackageEnvError>;
}

impl<T: PackageEnvProvider + ?Sized> PackageEnvProvider for &T {
    fn shell_env(&self) -> Result<EnvSnapshot, PackageEnvError> {
        (**self).shell_env()
    }
}

/// Project file devbox reads its package list from.
pub const DEVBOX_FILE: &str = "devbox.json";

/// Deadline for `devbox shellenv`, which may install packages on first run.
const SHELLENV_TIMEOUT: Duration = Duration::from_secs(600);

/// [`PackageEnvProvider`] backed by `devbox`.
#[derive(Debug, Clone)]
pub struct DevboxProvider {
    project_dir: PathBuf,
    timeout: Duration,
}

impl DevboxProvider {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            timeout: SHELLENV_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Fail unless the `devbox` binary is on `PATH`.
    pub fn ensure_dependencies(&self) -> Result<PathBuf, PackageEnvError> {
        which::which("devbox").map_err(|_| PackageEnvError::MissingDependency { binary: "devbox" })
    }

    /// Run `devbox init` when the project has no `devbox.json` yet.
    pub fn ensure_init(&self) -> Result<(), PackageEnvError> {
        if self.project_dir.join(DEVBOX_FILE).is_file() {
            return Ok(());
        }
        info!(dir = %self.project_dir.display(), "Initializing devbox project");
        let mut cmd = Command::new("devbox");
        cmd.arg("init").current_dir(&self.project_dir);
        run_inherited(cmd)?;
        Ok(())
    }
}

impl PackageEnvProvider for DevboxProvider {
    fn shell_env(&self) -> Result<EnvSnapshot, PackageEnvError> {
        self.ensure_dependencies()?;
        self.ensure_init()?;

        let mut cmd = Command::new("devbox");
        cmd.args(["shellenv", "--pure"]).current_dir(&self.project_dir);
        let script = run_with_timeout(cmd, self.timeout)?;

        // Evaluate the exports in an empty environment so only devbox's variables remain.
        let staged = tempfile::Builder::new()
            .prefix("inkube-shellenv-")
            .suffix(".sh")
            .tempfile()?;
        std::fs::write(staged.path(), &script)?;

        let mut cmd = Command::new("env");
        cmd.args(["-i", "bash", "-c"])
            .arg(format!(". {} && env", quote_path(staged.path())?))
            .current_dir(&self.project_dir);
        let out = run_with_timeout(cmd, self.timeout)?;

        let env = parse_env_output(&String::from_utf8_lossy(&out));
        debug!(count = env.len(), "Loaded devbox environment");
        Ok(env)
    }
}

fn quote_path(path: &Path) -> std::io::Result<String> {
    let raw = path.to_string_lossy();
    shlex::try_quote(&raw)
        .map(|q| q.into_owned())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))
}

/// Parse `env` output into a snapshot.
///
/// Lines without `=` are skipped. Bash-internal variables that describe the
/// evaluating shell rather than the package environment are dropped.
pub fn parse_env_output(output: &str) -> EnvSnapshot {
    let mut env = EnvSnapshot::from_pairs(output.lines());
    for key in ["_", "PWD", "OLDPWD", "SHLVL"] {
        env.remove(key);
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_output() {
        let out = "PATH=/nix/store/abc/bin:/usr/bin\nDEVBOX_PROJECT_ROOT=/work\nSHLVL=1\nPWD=/work\n_=/usr/bin/env\nMULTI=a=b\n";
        let env = parse_env_output(out);
        assert_eq!(env.get("PATH"), Some("/nix/store/abc/bin:/usr/bin"));
        assert_eq!(env.get("DEVBOX_PROJECT_ROOT"), Some("/work"));
        assert_eq!(env.get("MULTI"), Some("a=b"));
        assert!(!env.contains_key("SHLVL"));
        assert!(!env.contains_key("_"));
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_quote_path_round_trips() {
        for raw in ["/tmp/a b", "/tmp/it's", "/tmp/plain"] {
            let quoted = quote_path(Path::new(raw)).unwrap();
            assert_eq!(shlex::split(&quoted).unwrap(), vec![raw.to_string()]);
        }
    }

    #[test]
    fn test_ensure_init_skips_existing_project() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEVBOX_FILE), "{}").unwrap();
        DevboxProvider::new(dir.path()).ensure_init().unwrap();
    }
}
