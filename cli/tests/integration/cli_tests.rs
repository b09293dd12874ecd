//! Integration tests for the vpcforge CLI skeleton
//!
//! These tests verify the command tree and argument parsing.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn vpcforge() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vpcforge"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    // a set NO_COLOR counts as an argument, so clap would skip the help
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vpcforge"));
    cmd.env_remove("NO_COLOR");
    cmd.assert().code(2).stderr(predicate::str::contains(
        "Plan VPC subnets and write the Terraform tree",
    ));
}

#[test]
fn test_no_color_env_accepts_conventional_values() {
    for value in ["1", "yes", "true", "0", ""] {
        vpcforge()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("vpcforge v"));
    }
}

#[test]
fn test_cli_help_flag_lists_commands() {
    vpcforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("add-vpc"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    vpcforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "vpcforge {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_shows_version() {
    vpcforge()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "vpcforge v{}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = vpcforge()
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

// --- Argument parsing ---

#[test]
fn test_add_vpc_help_shows_overwrite_policy_flags() {
    vpcforge()
        .args(["add-vpc", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--overwrite"))
        .stdout(predicate::str::contains("--keep"))
        .stdout(predicate::str::contains("--skip-keys"))
        .stdout(predicate::str::contains("--zones"));
}

#[test]
fn test_overwrite_and_keep_conflict() {
    vpcforge()
        .args(["add-vpc", "--overwrite", "--keep"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_policy_rejected_by_parser() {
    vpcforge()
        .args(["plan", "--policy", "every-zone"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("every-zone"));
}

#[test]
fn test_subnet_prefix_out_of_range_rejected_by_parser() {
    vpcforge()
        .args(["plan", "--subnet-prefix", "33"])
        .assert()
        .code(2);
}
