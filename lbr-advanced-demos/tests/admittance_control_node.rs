use assert_cmd::Command;
use lbr_advanced_demos::package_manifest::PackageManifest;
use predicates::prelude::*;
use std::fs;

fn node() -> Command {
    Command::cargo_bin("admittance_control_node").unwrap()
}

#[test]
fn help_describes_node() {
    node()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Admittance control"));
}

#[test]
fn prints_manifest() {
    node()
        .arg("--print-manifest")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "admittance_control_node = lbr_advanced_demos.admittance_control_node:main",
        ))
        .stdout(predicate::str::contains("\"version\": \"0.0.0\""));
}

#[test]
fn every_console_script_is_a_built_executable() {
    let manifest = PackageManifest::included().unwrap();
    for entry_point in manifest.console_scripts().unwrap() {
        Command::cargo_bin(&entry_point.name)
            .unwrap()
            .arg("--version")
            .assert()
            .success();
    }
}

#[test]
fn runs_for_a_fixed_duration() {
    node()
        .args(["--duration", "0.1", "--wrench", "5,0,0,0,0,0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped after"));
}

#[test]
fn runs_while_monitoring() {
    node()
        .args([
            "--duration",
            "0.05",
            "--wrench",
            "0,0,-5,0,0,0",
            "--session-state",
            "monitoring-ready",
        ])
        .assert()
        .success();
}

#[test]
fn rejects_short_wrench() {
    node()
        .args(["--duration", "0.05", "--wrench", "1,2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrench needs 6 values"));
}

#[test]
fn rejects_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    node()
        .args(["--duration", "0.05", "--config"])
        .arg(dir.path().join("missing.yaml"))
        .assert()
        .failure();
}

#[test]
fn rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admittance_controller.yaml");
    fs::write(
        &path,
        "robot_name: lbr
admittance:
  mass: -1.0
  damping: 0.1
  stiffness: 0.0
inv_jac_ctrl:
  chain_root: lbr_link_0
  chain_tip: lbr_link_ee
  damping: 0.2
  max_linear_velocity: 0.1
  max_angular_velocity: 0.1
",
    )
    .unwrap();
    node()
        .args(["--duration", "0.05", "--config"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn rejects_non_positive_sample_time() {
    node()
        .args(["--duration", "0.05", "--sample-time", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample time must be positive"));
}

#[test]
fn rejects_sample_time_rounding_to_zero() {
    node()
        .args(["--duration", "0.05", "--sample-time", "1e-12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample time must be positive"));
}

#[test]
fn rejects_duration_out_of_range() {
    node()
        .args(["--duration", "1e30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duration must be between"));
}
