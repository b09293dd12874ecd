//! Integration tests for `vpcforge add-vpc`.
//!
//! Each test writes into its own temp infra root, passes `--zones` so no
//! cloud call is made, and skips key generation unless it is the subject.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Output;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vpcforge(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vpcforge"));
    cmd.env("NO_COLOR", "1")
        .env("VPCFORGE_CONFIG", dir.path().join("config.yaml"));
    cmd
}

fn root(dir: &TempDir) -> PathBuf {
    dir.path().join("infra")
}

fn region_dir(dir: &TempDir, region: &str) -> PathBuf {
    root(dir).join("dev").join(region)
}

/// `add-vpc` for `dev/<region>` with three zones and no key pair.
fn add_vpc(dir: &TempDir, region: &str, extra: &[&str]) -> Output {
    let zones = format!("{region}a,{region}b,{region}c");
    vpcforge(dir)
        .args(["add-vpc", "--env", "dev", "--region", region])
        .args(["--cidr", "10.0.0.0/16", "--mgmt-vpc-id", "vpc-0abc1234"])
        .args(["--policy", "all-zone", "--zones", &zones, "--skip-keys"])
        .arg("--root")
        .arg(root(dir))
        .args(extra)
        .output()
        .expect("run")
}

fn allow_region(dir: &TempDir, regions: &str) {
    vpcforge(dir)
        .args(["config", "set", "network.regions", regions])
        .assert()
        .success();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ---------------------------------------------------------------------------
// First run
// ---------------------------------------------------------------------------

#[test]
fn test_add_vpc_writes_terraform_tree() {
    let dir = TempDir::new().unwrap();
    let output = add_vpc(&dir, "us-east-1", &[]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let region = region_dir(&dir, "us-east-1");
    assert!(root(&dir).join("dev/variable.tf").is_file());
    assert_eq!(
        std::fs::read_link(region.join("variable.tf")).unwrap(),
        PathBuf::from("../variable.tf")
    );
    for name in ["provider.tf", "terraform.tfvars", "vpc.tf"] {
        assert!(region.join(name).is_file(), "{name} missing");
    }
    for script in ["plan.sh", "apply.sh", "destroy.sh"] {
        let mode = std::fs::metadata(region.join("scripts").join(script))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0, "{script} not executable");
    }
}

#[test]
fn test_add_vpc_renders_allocated_subnets() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());

    let region = region_dir(&dir, "us-east-1");
    let vpc = read(&region.join("vpc.tf"));
    assert!(vpc.contains(r#"resource "aws_vpc" "us_east_1""#), "{vpc}");
    assert!(vpc.contains(r#"resource "aws_subnet" "private_us_east_1a""#));
    assert!(vpc.contains(r#"resource "aws_subnet" "public_us_east_1c""#));
    assert!(vpc.contains("10.0.0.0/24"));
    assert!(vpc.contains("10.0.5.0/24"));
    assert!(vpc.contains("peer_vpc_id = var.mgmt_vpc_id"));

    let tfvars = read(&region.join("terraform.tfvars"));
    assert!(tfvars.contains(r#"cidr_block  = "10.0.0.0/16""#), "{tfvars}");
    assert!(tfvars.contains(r#"mgmt_vpc_id = "vpc-0abc1234""#));
    assert!(tfvars.contains(r#"key_name    = "dev-us-east-1""#));
}

// ---------------------------------------------------------------------------
// Idempotence and sharing
// ---------------------------------------------------------------------------

#[test]
fn test_add_vpc_second_run_is_noop() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    let before = read(&region_dir(&dir, "us-east-1").join("vpc.tf"));

    let output = add_vpc(&dir, "us-east-1", &["-y"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("unchanged"));
    assert!(!stdout(&output).contains("created"));
    assert_eq!(read(&region_dir(&dir, "us-east-1").join("vpc.tf")), before);
    assert!(!region_dir(&dir, "us-east-1").join("vpc.tf.NEW").exists());
}

#[test]
fn test_add_vpc_second_region_links_shared_file() {
    let dir = TempDir::new().unwrap();
    allow_region(&dir, "us-east-1,eu-west-1");
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    let shared = read(&root(&dir).join("dev/variable.tf"));

    let output = add_vpc(&dir, "eu-west-1", &[]);

    assert!(output.status.success());
    assert_eq!(read(&root(&dir).join("dev/variable.tf")), shared);
    assert_eq!(read(&region_dir(&dir, "eu-west-1").join("variable.tf")), shared);
    assert!(stdout(&output).contains("shared, left as is"));
}

// ---------------------------------------------------------------------------
// Overwrite policy
// ---------------------------------------------------------------------------

#[test]
fn test_add_vpc_keep_writes_new_alongside() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    let vpc = region_dir(&dir, "us-east-1").join("vpc.tf");
    std::fs::write(&vpc, "# hand edited\n").unwrap();

    let output = add_vpc(&dir, "us-east-1", &["--keep"]);

    assert!(output.status.success());
    assert_eq!(read(&vpc), "# hand edited\n");
    let alternate = region_dir(&dir, "us-east-1").join("vpc.tf.NEW");
    assert!(read(&alternate).contains("aws_vpc"));
    assert!(stdout(&output).contains("vpc.tf.NEW"));
}

#[test]
fn test_add_vpc_overwrite_replaces() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    let vpc = region_dir(&dir, "us-east-1").join("vpc.tf");
    std::fs::write(&vpc, "# hand edited\n").unwrap();

    let output = add_vpc(&dir, "us-east-1", &["--overwrite"]);

    assert!(output.status.success());
    assert!(read(&vpc).contains("aws_vpc"));
    assert!(stdout(&output).contains("replaced"));
}

#[test]
fn test_add_vpc_unresolved_conflict_exits_two() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    let provider = region_dir(&dir, "us-east-1").join("provider.tf");
    std::fs::write(&provider, "# mine\n").unwrap();

    let output = add_vpc(&dir, "us-east-1", &["-y"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(read(&provider), "# mine\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("path_conflict"));
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[test]
fn test_add_vpc_json_report() {
    let dir = TempDir::new().unwrap();
    let output = add_vpc(&dir, "us-east-1", &["--json"]);

    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["ok"], true);
    assert_eq!(v["topology"]["env"], "dev");
    assert_eq!(v["topology"]["subnets"].as_array().unwrap().len(), 6);
    let artifacts = v["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 5);
    assert_eq!(artifacts[0]["kind"], "environment-shared");
    assert_eq!(artifacts[0]["outcome"]["status"], "shared");
    assert_eq!(artifacts[0]["outcome"]["canonical"]["action"], "created");
    assert_eq!(artifacts[0]["outcome"]["reference"]["action"], "linked");
    assert_eq!(artifacts[4]["outcome"]["directory"], "created");
    assert!(v.get("keys").is_none());
}

#[test]
fn test_add_vpc_json_conflict_reported_with_code() {
    let dir = TempDir::new().unwrap();
    assert!(add_vpc(&dir, "us-east-1", &[]).status.success());
    std::fs::write(region_dir(&dir, "us-east-1").join("vpc.tf"), "# mine\n").unwrap();

    let output = add_vpc(&dir, "us-east-1", &["--json", "-y"]);

    assert_eq!(output.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["ok"], false);
    let failed: Vec<_> = v["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["outcome"]["status"] == "failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["template"], "aws/vpc.tf");
    assert_eq!(failed[0]["outcome"]["code"], "path_conflict");
}

// ---------------------------------------------------------------------------
// Configuration and templates
// ---------------------------------------------------------------------------

#[test]
fn test_add_vpc_uses_configured_root() {
    let dir = TempDir::new().unwrap();
    let configured = dir.path().join("configured");
    vpcforge(&dir)
        .args(["config", "set", "infra.root"])
        .arg(&configured)
        .assert()
        .success();

    vpcforge(&dir)
        .args(["add-vpc", "--env", "prod", "--region", "us-east-1"])
        .args(["--cidr", "10.2.0.0/16", "--mgmt-vpc-id", "vpc-1"])
        .args(["--zone", "us-east-1a", "--private-cidr", "10.2.0.0/24"])
        .args(["--public-cidr", "10.2.1.0/24", "--skip-keys"])
        .assert()
        .success();

    assert!(configured.join("prod/us-east-1/vpc.tf").is_file());
}

#[test]
fn test_add_vpc_template_dir_without_scripts_reports_bundle_missing() {
    let dir = TempDir::new().unwrap();
    let templates = dir.path().join("templates");
    std::fs::create_dir_all(templates.join("aws")).unwrap();
    for name in ["variable.tf", "provider.tf", "terraform.tfvars", "vpc.tf"] {
        std::fs::write(templates.join("aws").join(name), format!("# {name} {{{{ env }}}}\n"))
            .unwrap();
    }

    let output = add_vpc(&dir, "us-east-1", &["--templates", templates.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        read(&region_dir(&dir, "us-east-1").join("vpc.tf")),
        "# vpc.tf dev\n"
    );
    assert!(!region_dir(&dir, "us-east-1").join("scripts").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bundle_missing"));
}

#[test]
fn test_add_vpc_repeated_zone_is_planning_error() {
    let dir = TempDir::new().unwrap();
    let output = vpcforge(&dir)
        .args(["add-vpc", "--env", "dev", "--region", "us-east-1"])
        .args(["--cidr", "10.0.0.0/16", "--mgmt-vpc-id", "vpc-1"])
        .args(["--policy", "all-zone", "--zones", "us-east-1a,us-east-1a"])
        .args(["--skip-keys", "--json", "--root"])
        .arg(root(&dir))
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["code"], "planning_error");
    assert!(v["message"].as_str().unwrap().contains("more than once"));
    assert!(!root(&dir).exists());
}

#[test]
fn test_add_vpc_invalid_input_writes_nothing() {
    let dir = TempDir::new().unwrap();
    vpcforge(&dir)
        .args(["add-vpc", "--env", "dev", "--region", "us-east-1"])
        .args(["--cidr", "10.0.0.0/16", "--mgmt-vpc-id", "vpc-1"])
        .args(["--policy", "all-zone", "--zones", "a", "--zone", "a"])
        .arg("--root")
        .arg(root(&dir))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("single-zone"));

    assert!(!root(&dir).exists());
}
