//! Integration tests for argument parsing and the version command

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

pub fn puda() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("puda"));
    cmd.env("NO_COLOR", "1")
        .env_remove("PUDA_USER_ID")
        .env_remove("PUDA_USERNAME")
        .env_remove("PUDA_SCHEMA")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    puda().assert().code(2).stderr(predicate::str::contains(
        "Dispatch commands to PUDA lab machines",
    ));
}

#[test]
fn test_cli_help_lists_subcommands() {
    puda()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("send-batch"))
        .stdout(predicate::str::contains("get-state"))
        .stdout(predicate::str::contains("commands"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    puda()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("puda"));
}

#[test]
fn test_version_command_shows_version() {
    puda()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = puda()
        .args(["version", "--json"])
        .output()
        .expect("run puda");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_subcommand_fails() {
    puda().arg("launch").assert().failure();
}

#[test]
fn test_get_state_requires_machine_id() {
    puda()
        .arg("get-state")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--machine-id"));
}

#[test]
fn test_get_state_with_invalid_url_fails() {
    puda()
        .args(["get-state", "--machine-id", "first", "--valkey-url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: cannot connect"));
}
