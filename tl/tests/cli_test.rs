//! CLI tests for the `tl` binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `tl` command with an isolated home and the given config file contents
fn tl(temp: &TempDir, config: &str) -> Command {
    let config_path = temp.path().join("tierlimit.yml");
    fs::write(&config_path, config).expect("Failed to write config");

    let mut cmd = Command::cargo_bin("tl").expect("Failed to find tl binary");
    cmd.env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .current_dir(temp.path())
        .arg("--config")
        .arg(&config_path);
    cmd
}

const FAST_CONFIG: &str = r#"
limiter:
  sustained:
    quota: 2
    refresh-ms: 10
  burst:
    quota: 1
    refresh-ms: 20
"#;

#[test]
fn test_config_prints_effective_yaml() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    tl(&temp, FAST_CONFIG)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh-ms: 10"))
        .stdout(predicate::str::contains("fail-rate"));
}

#[test]
fn test_run_json_reports_all_tasks() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = tl(&temp, FAST_CONFIG)
        .args(["run", "-n", "5", "--min-ms", "1", "--max-ms", "3", "--fail-rate", "0", "--format", "json"])
        .output()
        .expect("Failed to run tl");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["tasks"].as_array().map(Vec::len), Some(5));
    assert_eq!(report["stats"]["total_completed"], 5);
    assert!(report["stats"]["peak_running"].as_u64().unwrap() <= 3);
    assert!(
        report["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .all(|task| task["outcome"]["status"] == "succeeded")
    );
}

#[test]
fn test_run_text_shows_summary() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    tl(&temp, FAST_CONFIG)
        .args(["run", "-n", "2", "--min-ms", "1", "--max-ms", "1", "--fail-rate", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 admitted"))
        .stdout(predicate::str::contains("simulated failure"));
}

#[test]
fn test_zero_quota_config_is_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = r#"
limiter:
  sustained:
    quota: 0
    refresh-ms: 10
"#;
    tl(&temp, config)
        .args(["run", "-n", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quota must be at least 1"));
}

#[test]
fn test_partial_burst_config_is_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = r#"
limiter:
  burst:
    quota: 3
"#;
    tl(&temp, config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_snapshot_lists_queued_work() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = r#"
limiter:
  sustained:
    quota: 1
    refresh-ms: 5
  burst: ~
"#;
    let output = tl(&temp, config)
        .args(["snapshot", "-n", "4", "--min-ms", "20", "--max-ms", "20", "--fail-rate", "0"])
        .output()
        .expect("Failed to run tl");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(snapshot["tiers"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["tiers"][0]["kind"], "sustained");
    assert_eq!(snapshot["tiers"][0]["running"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["pending"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["pending"][0]["label"], "sim-1");
}

#[test]
fn test_broken_local_config_is_not_ignored() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp.path().join(".tierlimit.yml"), "limiter:\n  burst:\n    quota: 5\n").expect("Failed to write config");

    Command::cargo_bin("tl")
        .expect("Failed to find tl binary")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains(".tierlimit.yml"));
}

#[test]
fn test_local_config_without_burst_runs_single_tier() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        temp.path().join(".tierlimit.yml"),
        "limiter:\n  sustained:\n    quota: 1\n    refresh-ms: 5\n",
    )
    .expect("Failed to write config");

    let output = Command::cargo_bin("tl")
        .expect("Failed to find tl binary")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .current_dir(temp.path())
        .args(["snapshot", "-n", "3", "--min-ms", "20", "--max-ms", "20", "--fail-rate", "0"])
        .output()
        .expect("Failed to run tl");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(snapshot["tiers"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["pending"].as_array().map(Vec::len), Some(2));
}
