//! CLI integration tests

use std::process::Command;

fn hra(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-p", "hra-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = hra(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("HR Analytics"), "Should show app name");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("bulk"), "Should show bulk command");
    assert!(stdout.contains("HRA_API_URL"), "Should document env var");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = hra(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("hra"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = hra(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("attrition"), "Should list model kinds");
    assert!(stdout.contains("retention"), "Should list model kinds");
}

/// Test that an unknown model kind is rejected
#[test]
fn test_bulk_rejects_unknown_kind() {
    let output = hra(&["bulk", "salary", "employees.csv"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown model should fail");
    assert!(stderr.contains("invalid value"), "Should explain the error");
}
