//! Integration tests for commands that read the pipeline context file.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flotilla(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flotilla"));
    cmd.env("NO_COLOR", "1")
        .env("FLOTILLA_CONFIG", dir.path().join("config.yaml"))
        .env_remove("FLOTILLA_CONTEXT");
    cmd
}

const RECORDED: &str = r#"{
  "cloud": { "ids": ["web-abcde"], "ips": ["10.1.2.3"], "private_ips": [], "names": ["web-abcde"] },
  "providers": {
    "multipass": { "ids": ["web-abcde"], "ips": ["10.1.2.3"], "private_ips": [], "names": ["web-abcde"] }
  },
  "machines": [
    { "id": "web-abcde", "name": "web-abcde", "address": "10.1.2.3", "private_address": "", "provider": "multipass" }
  ]
}"#;

#[test]
fn test_status_without_context_reports_nothing() {
    let dir = TempDir::new().unwrap();
    flotilla(&dir)
        .arg("--context")
        .arg(dir.path().join("context.json"))
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing recorded yet"));
}

#[test]
fn test_status_shows_recorded_instances() {
    let dir = TempDir::new().unwrap();
    let ctx = dir.path().join("context.json");
    std::fs::write(&ctx, RECORDED).unwrap();
    flotilla(&dir)
        .arg("--context")
        .arg(&ctx)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("web-abcde"))
        .stdout(predicate::str::contains("10.1.2.3"));
}

#[test]
fn test_status_json_round_trips_the_file() {
    let dir = TempDir::new().unwrap();
    let ctx = dir.path().join("context.json");
    std::fs::write(&ctx, RECORDED).unwrap();
    let output = flotilla(&dir)
        .arg("--context")
        .arg(&ctx)
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["providers"]["multipass"]["ips"][0], "10.1.2.3");
    assert_eq!(value["machines"][0]["provider"], "multipass");
}

#[test]
fn test_status_rejects_corrupt_context() {
    let dir = TempDir::new().unwrap();
    let ctx = dir.path().join("context.json");
    std::fs::write(&ctx, "{ not json").unwrap();
    flotilla(&dir)
        .arg("--context")
        .arg(&ctx)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_deprovision_with_empty_context_never_connects() {
    let dir = TempDir::new().unwrap();
    flotilla(&dir)
        .arg("--context")
        .arg(dir.path().join("context.json"))
        .args(["deprovision", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No servers found to be deprovisioned"));
}

#[test]
fn test_context_env_var_selects_file() {
    let dir = TempDir::new().unwrap();
    let ctx = dir.path().join("from-env.json");
    std::fs::write(&ctx, RECORDED).unwrap();
    flotilla(&dir)
        .env("FLOTILLA_CONTEXT", &ctx)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("web-abcde"));
}

#[test]
fn test_explicit_context_flag_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let from_env = dir.path().join("from-env.json");
    std::fs::write(&from_env, RECORDED).unwrap();
    flotilla(&dir)
        .env("FLOTILLA_CONTEXT", &from_env)
        .arg("--context")
        .arg(dir.path().join("empty.json"))
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing recorded yet"));
}
