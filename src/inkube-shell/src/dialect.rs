//! Shell dialects and how each one is pointed at a substitute init file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, ShellError};

/// Shell implementation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellDialect {
    Bash,
    Zsh,
    Ksh,
    Fish,
    /// dash, ash and other POSIX shells.
    Posix,
    Unknown,
}

/// How a dialect is made to load a generated init file instead of the user's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMechanism {
    /// Pass the file path after a flag (`bash --rcfile <path>`).
    RcFileArg(&'static str),
    /// Point a variable at the directory holding the file (`ZDOTDIR`).
    DirEnv(&'static str),
    /// Point a variable at the file itself (`ENV`).
    FileEnv(&'static str),
    /// Pass a command sourcing the file after a flag (`fish -C ". <path>"`).
    SourceCommandArg(&'static str),
    /// The shell is launched bare.
    None,
}

/// Extra environment and arguments for a shell launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOverrides {
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
}

impl ShellDialect {
    /// Classify a shell by binary path; a leading `-` login marker is ignored.
    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(Self::from_name)
            .unwrap_or(ShellDialect::Unknown)
    }

    pub fn from_name(name: &str) -> Self {
        match name.strip_prefix('-').unwrap_or(name) {
            "bash" => ShellDialect::Bash,
            "zsh" => ShellDialect::Zsh,
            "ksh" => ShellDialect::Ksh,
            "fish" => ShellDialect::Fish,
            "dash" | "ash" | "shell" => ShellDialect::Posix,
            _ => ShellDialect::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellDialect::Bash => "bash",
            ShellDialect::Zsh => "zsh",
            ShellDialect::Ksh => "ksh",
            ShellDialect::Fish => "fish",
            ShellDialect::Posix => "posix",
            ShellDialect::Unknown => "unknown",
        }
    }

    pub fn override_mechanism(&self) -> OverrideMechanism {
        match self {
            ShellDialect::Bash => OverrideMechanism::RcFileArg("--rcfile"),
            ShellDialect::Zsh => OverrideMechanism::DirEnv("ZDOTDIR"),
            ShellDialect::Ksh | ShellDialect::Posix => OverrideMechanism::FileEnv("ENV"),
            ShellDialect::Fish => OverrideMechanism::SourceCommandArg("-C"),
            ShellDialect::Unknown => OverrideMechanism::None,
        }
    }

    /// Startup files other than the rc that the shell reads from its init directory.
    pub fn auxiliary_files(&self) -> &'static [&'static str] {
        match self {
            ShellDialect::Zsh => &[".zshenv", ".zprofile", ".zlogin", ".zlogout", ".zimrc"],
            _ => &[],
        }
    }

    pub fn uses_fish_syntax(&self) -> bool {
        matches!(self, ShellDialect::Fish)
    }
}

impl std::fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl OverrideMechanism {
    /// Overrides that make the shell load `rc_path`.
    ///
    /// Arguments and variables reach the shell without word splitting, so
    /// paths are passed verbatim. Only the fish source command, which fish
    /// parses, quotes the path.
    pub fn apply(&self, rc_path: &Path) -> Result<ShellOverrides> {
        let mut overrides = ShellOverrides::default();
        let rc = rc_path.to_string_lossy().into_owned();
        match *self {
            OverrideMechanism::RcFileArg(flag) => {
                overrides.args = vec![flag.to_string(), rc];
            }
            OverrideMechanism::DirEnv(var) => {
                let dir = rc_path
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                overrides.env.insert(var.to_string(), dir);
            }
            OverrideMechanism::FileEnv(var) => {
                overrides.env.insert(var.to_string(), rc);
            }
            OverrideMechanism::SourceCommandArg(flag) => {
                let quoted = shlex::try_quote(&rc)
                    .map_err(|e| ShellError::TemplateRenderFailed(e.to_string()))?;
                overrides.args = vec![flag.to_string(), format!(". {quoted}")];
            }
            OverrideMechanism::None => {}
        }
        Ok(overrides)
    }
}
