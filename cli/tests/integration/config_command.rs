//! Integration tests for `flotilla config`.
//!
//! All filesystem-touching tests set `FLOTILLA_CONFIG` to a temp path so they
//! never read or write `~/.flotilla/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flotilla() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flotilla"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_show_and_set_subcommands() {
    flotilla()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "show"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("multipass"))
        .stdout(predicate::str::contains("600"))
        .stdout(predicate::str::contains("ssh.max_attempts"));
}

#[test]
fn test_config_show_does_not_create_file() {
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "show"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .success();
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "set", "ssh.user", "ubuntu"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set ssh.user = ubuntu"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("user: ubuntu"), "{content}");

    flotilla()
        .args(["--json", "config", "show"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""user": "ubuntu""#));
}

#[cfg(unix)]
#[test]
fn test_config_set_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "set", "timeout_secs", "120"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .success();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_config_set_unknown_key_fails_without_writing() {
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "set", "security.level", "strict"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: security.level"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_rejects_zero_timeout() {
    let (_dir, path) = temp_config_path();
    flotilla()
        .args(["config", "set", "timeout_secs", "0"])
        .env("FLOTILLA_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive integer"));
}
