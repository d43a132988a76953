//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A drillkit command isolated from any config in the real home directory.
fn drillkit(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("drillkit").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("DRILLKIT_GATEWAY_KEY")
        .env_remove("DRILLKIT_ANTHROPIC_KEY")
        .env("RUST_LOG", "off");
    cmd
}

fn science_bank() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../banks/science.toml")
}

const OFFLINE_CONFIG: &str = r#"
default_provider = "offline"
default_model = "mock-model"

[providers.offline]
type = "mock"
"#;

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timed quizzes"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("drillkit"));
}

#[test]
fn list_variants_shows_presets() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("list-variants")
        .assert()
        .success()
        .stdout(predicate::str::contains("arithmetic"))
        .stdout(predicate::str::contains("60s session"))
        .stdout(predicate::str::contains("30s per item"))
        .stdout(predicate::str::contains("open board"));
}

#[test]
fn validate_sample_bank() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg(science_bank())
        .assert()
        .success()
        .stdout(predicate::str::contains("Science Basics (8 questions)"))
        .stdout(predicate::str::contains("All banks valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let bank = dir.path().join("dup.toml");
    std::fs::write(
        &bank,
        r#"
[bank]
id = "dup"
name = "Dup"

[[questions]]
id = "q1"
question = "Pick one"
options = ["same", "Same"]
answer = 0
"#,
    )
    .unwrap();

    drillkit(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("[q1] WARNING: options are not distinct"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn play_arithmetic_and_record_history() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");

    drillkit(dir.path())
        .args(["play", "--variant", "arithmetic", "--items", "3", "--seed", "7"])
        .arg("--results-dir")
        .arg(&results)
        .write_stdin("x\nx\nx\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrong. The answer was"))
        .stdout(predicate::str::contains("Session over: finished"))
        .stdout(predicate::str::contains("Final score: 0"));

    let log = std::fs::read_to_string(results.join("results.jsonl")).unwrap();
    assert!(log.contains("\"kind\":\"session_created\""));
    assert_eq!(log.matches("\"kind\":\"answer\"").count(), 3);
    assert!(log.contains("\"kind\":\"finalized\""));

    drillkit(dir.path())
        .arg("history")
        .arg("--results-dir")
        .arg(&results)
        .assert()
        .success()
        .stdout(predicate::str::contains("arithmetic"))
        .stdout(predicate::str::contains("1 session(s)"));
}

#[test]
fn closing_input_abandons() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");

    drillkit(dir.path())
        .args(["play", "--variant", "scramble", "--items", "4"])
        .arg("--results-dir")
        .arg(&results)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Input closed"))
        .stdout(predicate::str::contains("Session over: abandoned"));
}

#[test]
fn quiz_with_offline_generator() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("drillkit.toml");
    std::fs::write(&config, OFFLINE_CONFIG).unwrap();

    drillkit(dir.path())
        .args(["play", "--variant", "quiz", "--items", "2"])
        .arg("--config")
        .arg(&config)
        .arg("--results-dir")
        .arg(dir.path().join("results"))
        .write_stdin("Carbon dioxide\nB\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Correct! +10"))
        .stdout(predicate::str::contains("Final score: 20"));
}

#[test]
fn quiz_from_bank_needs_no_provider() {
    let dir = TempDir::new().unwrap();

    drillkit(dir.path())
        .args(["play", "--variant", "quiz", "--items", "2", "--seed", "1"])
        .arg("--bank")
        .arg(science_bank())
        .arg("--results-dir")
        .arg(dir.path().join("results"))
        .write_stdin(":quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("(1/2)"))
        .stdout(predicate::str::contains("Session over: abandoned"));
}

#[test]
fn quiz_without_provider_fails() {
    let dir = TempDir::new().unwrap();

    drillkit(dir.path())
        .args(["play", "--variant", "quiz"])
        .arg("--results-dir")
        .arg(dir.path().join("results"))
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn history_with_no_results() {
    let dir = TempDir::new().unwrap();
    drillkit(dir.path())
        .arg("history")
        .arg("--results-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions recorded"));
}

#[test]
fn history_json_output() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");

    drillkit(dir.path())
        .args(["play", "--variant", "typing", "--items", "2", "--seed", "3"])
        .arg("--results-dir")
        .arg(&results)
        .write_stdin(":q\n")
        .assert()
        .success();

    let output = drillkit(dir.path())
        .args(["history", "--json"])
        .arg("--results-dir")
        .arg(&results)
        .output()
        .unwrap();
    assert!(output.status.success());
    let summaries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summaries[0]["variant"], "typing");
    assert_eq!(summaries[0]["sessions"], 1);
    assert_eq!(summaries[0]["completed"], 0);
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    drillkit(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created drillkit.toml"))
        .stdout(predicate::str::contains("Created banks/starter.toml"));

    assert!(dir.path().join("drillkit.toml").exists());

    drillkit(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg("banks/starter.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All banks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    drillkit(dir.path()).arg("init").assert().success();

    drillkit(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn list_models_for_configured_providers() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("drillkit.toml");
    std::fs::write(&config, OFFLINE_CONFIG).unwrap();

    drillkit(dir.path())
        .arg("list-models")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: offline (default)"))
        .stdout(predicate::str::contains("mock-model"));
}
