//! Shell detection and session bootstrap for inkube.
//!
//! A dev session runs in the user's own shell. [`ShellProfile`] works out
//! which shell that is and where its init file lives; [`ShellBootstrap`]
//! renders a temporary init file that pulls in the user's configuration,
//! points the shell at it through the dialect's [`OverrideMechanism`] and
//! runs the shell in the foreground with the composed environment.

pub mod bootstrap;
pub mod dialect;
pub mod error;
pub mod profile;
pub mod template;

pub use bootstrap::{
    AuxFileReport, LinkOutcome, PreparedSession, SessionContext, SessionOutcome, ShellBootstrap,
    ShellExit, StaleStateHook,
};
pub use dialect::{OverrideMechanism, ShellDialect, ShellOverrides};
pub use error::{Result, ShellError};
pub use profile::{EnvOptions, ShellEnvironment, ShellProfile};
pub use template::{Template, TemplateContext};
