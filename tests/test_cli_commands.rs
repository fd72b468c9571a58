//! CLI behavior through the compiled binary: exit codes, version output,
//! validation reporting, and a short end-to-end run.

mod common;

use std::process::Command;

use common::fixture;

const GOOD: &str = r"
experiment:
  name: cli-demo
  tick_interval: 1ms
blocks:
  - name: main
    trials:
      - name: t
        phases:
          - { name: a, kind: fixed, ticks: 2 }
";

const BAD: &str = r"
experiment:
  name: cli-demo
blocks:
  - name: main
    trials:
      - name: t
        phases:
          - { name: a, kind: mystery }
";

fn trialflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_trialflow"))
}

#[test]
fn test_version_prints_name_and_version() {
    let output = trialflow().arg("version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trialflow"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_json_output() {
    let output = trialflow()
        .args(["version", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(parsed["name"], "trialflow");
}

#[test]
fn test_validate_accepts_good_definition() {
    let file = fixture(GOOD);
    let output = trialflow()
        .args(["validate", file.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok"));
}

#[test]
fn test_validate_rejects_unknown_kind_with_config_exit_code() {
    let file = fixture(BAD);
    let output = trialflow()
        .args(["validate", file.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "config errors exit with 2");
    assert!(String::from_utf8_lossy(&output.stdout).contains("mystery"));
}

#[test]
fn test_validate_json_reports_issues() {
    let file = fixture(BAD);
    let output = trialflow()
        .args(["validate", "--format", "json", file.path().to_str().unwrap()])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(parsed["valid"], false);
    assert!(parsed["issues"].as_array().is_some_and(|a| !a.is_empty()));
}

#[test]
fn test_validate_missing_file_fails() {
    let output = trialflow()
        .args(["validate", "/no/such/experiment.yaml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_completes_and_writes_event_stream() {
    let file = fixture(GOOD);
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    let output = trialflow()
        .args([
            "run",
            "--config",
            file.path().to_str().unwrap(),
            "--events",
            events.to_str().unwrap(),
            "--no-console",
            "--quiet",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let contents = std::fs::read_to_string(&events).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["type"], "ExperimentStarted");
    assert_eq!(lines.last().unwrap()["type"], "ExperimentCompleted");
    assert!(lines.iter().any(|l| l["type"] == "PhaseEntered"));
}

#[test]
fn test_run_rejects_bad_tick_interval() {
    let file = fixture(GOOD);
    let output = trialflow()
        .args([
            "run",
            "--config",
            file.path().to_str().unwrap(),
            "--tick-interval",
            "yesterday",
            "--no-console",
            "--quiet",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
