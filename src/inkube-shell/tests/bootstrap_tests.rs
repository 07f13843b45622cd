use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use inkube_env::EnvSnapshot;
use inkube_shell::{
    LinkOutcome, SessionContext, ShellBootstrap, ShellDialect, ShellEnvironment, ShellError,
    ShellExit, ShellProfile,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn home_env(home: &Path) -> ShellEnvironment {
    ShellEnvironment {
        home: Some(home.to_path_buf()),
        ..Default::default()
    }
}

fn base_env() -> EnvSnapshot {
    [("PATH", "/usr/bin:/bin"), ("FOO", "bar"), ("INKUBE", "true")]
        .into_iter()
        .collect()
}

#[test]
fn test_zsh_session_points_zdotdir_at_generated_dir() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".zshrc"), "alias k=kubectl\n").unwrap();
    std::fs::write(home.path().join(".zshenv"), "export EDITOR=vi\n").unwrap();

    let profile = ShellProfile::for_binary("/bin/zsh", &home_env(home.path()));
    assert_eq!(profile.dialect, ShellDialect::Zsh);

    let bootstrap = ShellBootstrap::new(profile);
    let ctx = SessionContext::new("/work/api", base_env());
    let prepared = bootstrap.prepare(&ctx).unwrap();

    let zdotdir = prepared.env().get("ZDOTDIR").map(PathBuf::from);
    assert_eq!(zdotdir.as_deref(), Some(prepared.dir()));
    assert_eq!(prepared.rc_path(), prepared.dir().join(".zshrc"));
    assert_eq!(prepared.env().get("SHELL"), Some("/bin/zsh"));
    assert_eq!(prepared.env().get("FOO"), Some("bar"));
    assert!(prepared.args().is_empty());

    let rc = std::fs::read_to_string(prepared.rc_path()).unwrap();
    assert!(rc.contains("alias k=kubectl"));

    let zshenv = prepared.dir().join(".zshenv");
    assert_eq!(std::fs::read_to_string(zshenv).unwrap(), "export EDITOR=vi\n");

    let outcomes: Vec<_> = prepared
        .aux_files()
        .iter()
        .map(|r| (r.name, r.outcome.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (".zshenv", LinkOutcome::Linked),
            (".zprofile", LinkOutcome::Skipped),
            (".zlogin", LinkOutcome::Skipped),
            (".zlogout", LinkOutcome::Skipped),
            (".zimrc", LinkOutcome::Skipped),
        ]
    );
}

#[test]
fn test_unreadable_startup_file_is_reported_not_fatal() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".zshenv"), "export EDITOR=vi\n").unwrap();
    std::fs::create_dir(home.path().join(".zprofile")).unwrap();

    let profile = ShellProfile::for_binary("/bin/zsh", &home_env(home.path()));
    let prepared = ShellBootstrap::new(profile)
        .prepare(&SessionContext::new("/work/api", base_env()))
        .unwrap();

    let reports = prepared.aux_files();
    assert_eq!(reports[0].name, ".zshenv");
    assert_eq!(reports[0].outcome, LinkOutcome::Linked);
    assert_eq!(reports[1].name, ".zprofile");
    assert!(matches!(reports[1].outcome, LinkOutcome::Failed(_)));
    assert!(reports[1].failed());
    assert!(reports[2..].iter().all(|r| r.outcome == LinkOutcome::Skipped));
    assert_eq!(reports.iter().filter(|r| r.failed()).count(), 1);
    assert!(prepared.rc_path().exists());
}

#[test]
fn test_bash_session_uses_rcfile_argument() {
    let home = TempDir::new().unwrap();
    let profile = ShellProfile::for_binary("/bin/bash", &home_env(home.path()));
    let prepared = ShellBootstrap::new(profile)
        .prepare(&SessionContext::new("/work/api", base_env()))
        .unwrap();

    assert_eq!(prepared.rc_path(), prepared.dir().join(".bashrc"));
    assert_eq!(
        prepared.args(),
        &["--rcfile".to_string(), prepared.rc_path().to_string_lossy().into_owned()]
    );
    assert!(prepared.aux_files().is_empty());
    // A missing user rc is silently omitted.
    let rc = std::fs::read_to_string(prepared.rc_path()).unwrap();
    assert!(!rc.contains("# Begin"));
}

#[test]
fn test_fish_session_sources_generated_config() {
    let home = TempDir::new().unwrap();
    let profile = ShellProfile::for_binary("/usr/bin/fish", &home_env(home.path()));
    let prepared = ShellBootstrap::new(profile)
        .prepare(&SessionContext::new("/work/api", base_env()))
        .unwrap();

    assert_eq!(prepared.rc_path(), prepared.dir().join("config.fish"));
    assert_eq!(prepared.args()[0], "-C");
    assert!(prepared.args()[1].starts_with(". "));
}

#[test]
fn test_command_is_appended() {
    let home = TempDir::new().unwrap();
    let profile = ShellProfile::for_binary("/bin/bash", &home_env(home.path()));
    let ctx = SessionContext::new("/work/api", base_env()).with_command("env");
    let prepared = ShellBootstrap::new(profile).prepare(&ctx).unwrap();

    let args = prepared.args();
    assert_eq!(&args[args.len() - 2..], &["-c".to_string(), "env".to_string()]);
}

#[cfg(unix)]
#[test]
fn test_nonzero_exit_is_a_successful_outcome() {
    let home = TempDir::new().unwrap();
    let temp_root = TempDir::new().unwrap();
    let profile = ShellProfile::for_binary("/bin/sh", &home_env(home.path()));
    let bootstrap = ShellBootstrap::new(profile).with_temp_root(temp_root.path());

    let calls = Rc::new(Cell::new(0));
    let hook_calls = Rc::clone(&calls);
    let ctx = SessionContext::new(home.path(), base_env())
        .with_command("exit 3")
        .with_stale_state_hook(move || hook_calls.set(hook_calls.get() + 1));

    let outcome = bootstrap.run(ctx).unwrap();
    assert_eq!(outcome.exit, ShellExit::Code(3));
    assert!(!outcome.exit.success());
    assert_eq!(calls.get(), 1);

    // The session directory is gone once the shell has exited.
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_child_sees_session_environment() {
    let home = TempDir::new().unwrap();
    let out_file = home.path().join("out");
    let profile = ShellProfile::for_binary("/bin/sh", &home_env(home.path()));
    let ctx = SessionContext::new(home.path(), base_env()).with_command(format!(
        "printf '%s %s' \"$FOO\" \"$INKUBE\" > '{}'",
        out_file.display()
    ));

    let outcome = ShellBootstrap::new(profile).run(ctx).unwrap();
    assert!(outcome.exit.success());
    assert_eq!(std::fs::read_to_string(out_file).unwrap(), "bar true");
}

#[test]
fn test_missing_binary_is_launch_error() {
    let home = TempDir::new().unwrap();
    let profile = ShellProfile::for_binary("/nonexistent/inkube-test/zsh", &home_env(home.path()));
    let err = ShellBootstrap::new(profile)
        .run(SessionContext::new(home.path(), base_env()))
        .unwrap_err();
    assert!(matches!(err, ShellError::Launch { .. }));
}

#[test]
fn test_unwritable_temp_root_is_filesystem_error() {
    let home = TempDir::new().unwrap();
    let blocker = home.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let profile = ShellProfile::for_binary("/bin/bash", &home_env(home.path()));
    let err = ShellBootstrap::new(profile)
        .with_temp_root(&blocker)
        .prepare(&SessionContext::new(home.path(), base_env()))
        .unwrap_err();
    assert!(matches!(err, ShellError::FileSystem { .. }));
}
