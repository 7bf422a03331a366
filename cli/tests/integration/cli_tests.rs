//! Integration tests for the flotilla CLI skeleton.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn flotilla() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flotilla"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    flotilla().assert().code(2).stderr(predicate::str::contains(
        "Provision, bootstrap and tear down batches of cloud instances",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    flotilla()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("deprovision"))
        .stdout(predicate::str::contains("find"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command_shows_version() {
    flotilla()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!("flotilla v", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = flotilla()
        .args(["version", "--json"])
        .output()
        .expect("run flotilla");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_command_fails() {
    flotilla()
        .arg("launch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// --- provision argument validation ---

#[test]
fn test_provision_help_shows_ssh_flags() {
    flotilla()
        .args(["provision", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--ssh-command"))
        .stdout(predicate::str::contains("--private-key-path"))
        .stdout(predicate::str::contains("--no-wait-public-ip"));
}

#[test]
fn test_provision_rejects_zero_count() {
    flotilla()
        .args(["provision", "--count", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_provision_rejects_malformed_option() {
    flotilla()
        .args(["provision", "--option", "image"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn test_provision_unknown_provider_fails_before_doing_anything() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    flotilla()
        .env("FLOTILLA_CONFIG", dir.path().join("config.yaml"))
        .arg("--context")
        .arg(dir.path().join("context.json"))
        .args(["provision", "--provider", "openstack"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown provider: openstack"));
    assert!(!dir.path().join("context.json").exists());
}

#[test]
fn test_json_error_object_on_failure() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let output = flotilla()
        .env("FLOTILLA_CONFIG", dir.path().join("config.yaml"))
        .args(["--json", "find", "web", "--provider", "openstack"])
        .output()
        .expect("run flotilla");
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "error");
    assert!(
        value["message"]
            .as_str()
            .expect("message")
            .contains("Unknown provider: openstack")
    );
}
