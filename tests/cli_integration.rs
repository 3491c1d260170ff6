//! CLI Integration Tests
//!
//! End-to-end tests for CLI commands using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the verdict binary for testing
fn verdict_cmd() -> Command {
    let mut cmd = Command::cargo_bin("verdict").unwrap();
    cmd.env_remove("VERDICT_LOG_LEVEL")
        .env_remove("VERDICT_STRATEGY")
        .env("RUST_LOG", "error");
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("verdict.toml");
    std::fs::write(&path, body).unwrap();
    path
}

const STATIC_BACKENDS: &str = r#"
[[backends]]
id = "strict"
type = "static"
fixed = { risk_score = 0.9, confidence = 0.9 }

[[backends]]
id = "lenient"
type = "static"
fixed = { risk_score = 0.7, confidence = 0.8 }

[[backends]]
id = "offline"
type = "static"
fixed = { risk_score = 0.0, confidence = 1.0 }
enabled = false
"#;

#[test]
fn test_version_output() {
    verdict_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict"));
}

#[test]
fn test_help_shows_all_commands() {
    verdict_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("backends"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_evaluate_help() {
    verdict_cmd()
        .args(["evaluate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--backend"))
        .stdout(predicate::str::contains("--deadline-ms"));
}

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("verdict.toml");

    verdict_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .success();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[engine]"));
    assert!(content.contains("[[backends]]"));
}

#[test]
fn test_config_init_no_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "existing content");

    verdict_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exists"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, "existing content");
}

#[test]
fn test_config_init_force_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "existing content");

    verdict_cmd()
        .args([
            "config",
            "init",
            "-o",
            config_path.to_str().unwrap(),
            "--force",
        ])
        .assert()
        .success();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[engine]"));
}

#[test]
fn test_backends_list_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, STATIC_BACKENDS);

    let output = verdict_cmd()
        .args([
            "backends",
            "list",
            "--json",
            "-c",
            config_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = parsed["backends"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["lenient", "offline", "strict"]);
}

#[test]
fn test_backends_list_enabled_only() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, STATIC_BACKENDS);

    verdict_cmd()
        .args([
            "backends",
            "list",
            "--enabled-only",
            "-c",
            config_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("strict"))
        .stdout(predicate::str::contains("offline").not());
}

#[test]
fn test_evaluate_static_backends_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, STATIC_BACKENDS);

    let output = verdict_cmd()
        .args([
            "evaluate",
            "some content",
            "--json",
            "-s",
            "majority",
            "-c",
            config_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["decision"], "flagged");
    assert_eq!(parsed["strategy"], "majority");
    assert_eq!(parsed["verdicts"].as_array().unwrap().len(), 2);
}

#[test]
fn test_evaluate_reads_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, STATIC_BACKENDS);
    let content_path = temp_dir.path().join("content.txt");
    std::fs::write(&content_path, "content from disk").unwrap();

    verdict_cmd()
        .args([
            "evaluate",
            "-f",
            content_path.to_str().unwrap(),
            "-c",
            config_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("strict"));
}

#[test]
fn test_evaluate_unreachable_backend_fails_quorum() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
[[backends]]
id = "unreachable"
type = "http"
url = "http://127.0.0.1:9/evaluate"
timeout_ms = 2000
"#,
    );

    verdict_cmd()
        .args(["evaluate", "text", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient quorum"));
}

#[test]
fn test_evaluate_without_backends_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "");

    verdict_cmd()
        .args(["evaluate", "text", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no enabled backend"));
}

#[test]
fn test_evaluate_requires_content() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, STATIC_BACKENDS);

    verdict_cmd()
        .args(["evaluate", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provide content"));
}

#[test]
fn test_evaluate_rejects_unknown_strategy() {
    verdict_cmd()
        .args(["evaluate", "text", "-s", "plurality"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plurality"));
}

#[test]
fn test_evaluate_rejects_nan_threshold() {
    verdict_cmd()
        .args(["evaluate", "text", "--risk-threshold", "NaN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 0 and 1"));
}

#[test]
fn test_invalid_command() {
    verdict_cmd()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    verdict_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete"));
}

#[test]
fn test_completions_zsh() {
    verdict_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compdef"));
}
