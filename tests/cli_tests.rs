//! Integration tests for command-line configuration handling and the
//! one-shot `scrape` subcommand.

use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// Helper to get the binary path
fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_kubelet-summary-exporter"))
}

fn run(args: &[&str]) -> (bool, String, String) {
    let output = std::process::Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command");

    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_check_config_without_target_address() {
    let (success, stdout, stderr) = run(&["--no-config", "--check-config"]);

    assert!(!success);
    assert!(
        stdout.contains("target_address is not set") || stderr.contains("target_address is not set"),
        "Expected error about missing target address, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_check_config_with_target_address() {
    let (success, stdout, stderr) = run(&[
        "--no-config",
        "--target-address",
        "10.0.0.5",
        "--check-config",
    ]);

    assert!(
        success,
        "Expected valid config, got stdout: '{}', stderr: '{}'",
        stdout, stderr
    );
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn test_check_config_rejects_zero_timeout() {
    let (success, stdout, stderr) = run(&[
        "--no-config",
        "--target-address",
        "10.0.0.5",
        "--timeout",
        "0",
        "--check-config",
    ]);

    assert!(!success);
    assert!(
        stdout.contains("timeout_seconds must be greater than 0")
            || stderr.contains("timeout_seconds must be greater than 0"),
        "Expected timeout error, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_check_config_from_yaml_file() {
    let mut config = Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    writeln!(config, "target_address: node-a.internal\nkubelet_port: 10250").unwrap();

    let path = config.path().to_str().unwrap().to_string();
    let (success, stdout, stderr) = run(&["--config", &path, "--check-config"]);

    assert!(
        success,
        "Expected valid config, got stdout: '{}', stderr: '{}'",
        stdout, stderr
    );
}

#[test]
fn test_cli_overrides_config_file() {
    let mut config = Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    writeln!(config, "target_address: node-a.internal\nport: 9100").unwrap();

    let path = config.path().to_str().unwrap().to_string();
    let (success, stdout, _) = run(&[
        "--config",
        &path,
        "--port",
        "9200",
        "--show-config",
        "--config-format",
        "json",
    ]);

    assert!(success);
    assert!(stdout.contains("\"target_address\": \"node-a.internal\""), "stdout: {}", stdout);
    assert!(stdout.contains("\"port\": 9200"), "stdout: {}", stdout);
    assert!(stdout.contains("\"kubelet_port\": 10250"), "stdout: {}", stdout);
}

#[test]
fn test_scrape_unreachable_kubelet_reports_request_error() {
    let mut token = NamedTempFile::new().expect("Failed to create token file");
    writeln!(token, "test-token").unwrap();
    let token_path = token.path().to_str().unwrap().to_string();

    let (success, stdout, stderr) = run(&[
        "--no-config",
        "--log-level",
        "off",
        "--target-address",
        "127.0.0.1",
        "--kubelet-port",
        "1",
        "--timeout",
        "2",
        "--token-path",
        &token_path,
        "scrape",
    ]);

    assert!(!success);
    assert!(
        stdout.contains("kubelet_summary_exporter_errors{type=\"request error\"} 1"),
        "Expected request error counter, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
    assert!(!stdout.contains("kubelet_summary_node_"));
}

#[test]
fn test_scrape_missing_token_exits() {
    let (success, stdout, _) = run(&[
        "--no-config",
        "--log-level",
        "off",
        "--target-address",
        "127.0.0.1",
        "--kubelet-port",
        "1",
        "--token-path",
        "/nonexistent/kubelet-summary-exporter/token",
        "scrape",
    ]);

    assert!(!success);
    assert!(stdout.is_empty(), "Expected no exposition, got '{}'", stdout);
}
