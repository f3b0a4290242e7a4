//! CLI smoke tests for the backoffice-server binary
//!
//! These tests drive the built binary end to end: help output, configuration
//! validation, overrides and a short-lived server start.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn run_backoffice_server(args: &[&str]) -> std::process::Output {
    run_backoffice_server_with_env(args, &[])
}

fn run_backoffice_server_with_env(args: &[&str], envs: &[(&str, &str)]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_backoffice-server"))
        .args(args)
        .envs(envs.iter().copied())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute backoffice-server")
}

/// Helper to run the backoffice-server binary with timeout
async fn run_backoffice_server_with_timeout(
    args: &[&str],
    timeout_duration: Duration,
) -> Result<std::process::Output, Box<dyn std::error::Error>> {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_backoffice-server"));
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match timeout(timeout_duration, cmd.output()).await {
        Ok(result) => result.map_err(|e| e.into()),
        Err(elapsed) => Err(elapsed.into()),
    }
}

/// Write `body` under a `server`/`logging` preamble rooted in `home`.
fn write_config(dir: &Path, name: &str, home: &Path, body: &str) -> PathBuf {
    let content = format!(
        r#"
server:
  home_dir: "{home}"
  host: "127.0.0.1"
  port: 0

logging:
  default:
    console_level: info
    file: "logs/backoffice.log"
    file_level: info
    max_backups: 3
    max_size_mb: 10
{body}"#,
        home = home.to_string_lossy().replace('\\', "/"),
    );
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write config file");
    path
}

fn dump(output: &std::process::Output) {
    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
        eprintln!("STDOUT: {}", String::from_utf8_lossy(&output.stdout));
    }
}

#[test]
fn test_cli_help_command() {
    let output = run_backoffice_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backoffice-server"), "Should contain binary name");
    assert!(
        stdout.contains("Usage:") || stdout.contains("USAGE:"),
        "Should contain usage information"
    );
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--mock"), "Should mention mock option");
}

#[test]
fn test_cli_version_command() {
    let output = run_backoffice_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backoffice-server"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_backoffice_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized"),
        "Should contain error message about invalid command: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_backoffice_server(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention config file issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_flag_short_form() {
    let output = run_backoffice_server(&["-c", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config file");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"), "{}", stderr);
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");

    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_backoffice_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("yaml") || stderr.contains("parse"),
        "Should mention YAML parsing issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let home = temp_dir.path().join("home");
    let config_path = write_config(
        temp_dir.path(),
        "valid.yaml",
        &home,
        r#"
database:
  url: "sqlite://database/backoffice.db"

modules:
  backoffice:
    default_page_size: 50
    identity:
      domain: "tenant.example"
      audience: "backoffice-api"
"#,
    );

    let output = run_backoffice_server(&["--config", config_path.to_str().unwrap(), "check"]);
    dump(&output);

    assert!(output.status.success(), "Should succeed with valid config");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"), "{}", stdout);
    assert!(home.is_dir(), "home_dir should be created");
}

#[test]
fn test_cli_check_rejects_unknown_module_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "typo.yaml",
        temp_dir.path(),
        r#"
modules:
  backoffice:
    default_page_sise: 50
"#,
    );

    let output = run_backoffice_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Unknown module keys should fail the check");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("modules.backoffice"), "{}", stderr);
}

#[test]
fn test_cli_check_rejects_unsupported_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "mysql.yaml",
        temp_dir.path(),
        r#"
database:
  url: "mysql://localhost/backoffice"
"#,
    );

    let output = run_backoffice_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported database type"), "{}", stderr);
}

#[test]
fn test_cli_mock_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "mock.yaml",
        temp_dir.path(),
        r#"
database:
  url: "postgresql://localhost/nonexistent"
"#,
    );

    // --mock swaps the PostgreSQL DSN for in-memory SQLite
    let output =
        run_backoffice_server(&["--config", config_path.to_str().unwrap(), "--mock", "check"]);
    dump(&output);

    assert!(output.status.success(), "Should succeed with mock database");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sqlite::memory:"), "{}", stdout);
}

#[test]
fn test_cli_print_config_applies_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "print.yaml", temp_dir.path(), "");

    let output = run_backoffice_server(&[
        "--config",
        config_path.to_str().unwrap(),
        "--port",
        "9123",
        "-vv",
        "--print-config",
    ]);
    dump(&output);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9123"), "{}", stdout);
    assert!(stdout.contains("console_level: trace"), "{}", stdout);
}

#[test]
fn test_cli_env_overrides_file_values() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "env.yaml", temp_dir.path(), "");

    let output = run_backoffice_server_with_env(
        &["--config", config_path.to_str().unwrap(), "--print-config"],
        &[("APP__SERVER__PORT", "8087")],
    );
    dump(&output);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 8087"), "{}", stdout);
}

#[test]
fn test_shipped_config_passes_check() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/backoffice.yaml");
    let home = temp_dir.path().to_string_lossy().to_string();

    let output = run_backoffice_server_with_env(
        &["--config", config_path.to_str().unwrap(), "check"],
        &[("APP__SERVER__HOME_DIR", home.as_str())],
    );
    dump(&output);

    assert!(output.status.success(), "Shipped config should be valid");
}

#[test]
fn test_cli_run_rejects_invalid_bind_address() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("badhost.yaml");
    let content = format!(
        r#"
server:
  home_dir: "{}"
  host: "not a host"
  port: 8000
"#,
        temp_dir.path().to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");

    let output =
        run_backoffice_server(&["--config", config_path.to_str().unwrap(), "--mock", "run"]);

    assert!(!output.status.success(), "Should fail with invalid bind address");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid bind address"), "{}", stderr);
}

#[tokio::test]
async fn test_cli_run_command_with_mock_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "run.yaml", temp_dir.path(), "");

    // Server should start and keep running until the timeout fires
    let result = run_backoffice_server_with_timeout(
        &["--config", config_path.to_str().unwrap(), "--mock", "run"],
        Duration::from_secs(10),
    )
    .await;

    match result {
        Err(err) => {
            assert!(
                err.to_string().contains("elapsed"),
                "Server failed to start: {}",
                err
            );
        }
        Ok(output) => {
            eprintln!("STDOUT: {}", String::from_utf8_lossy(&output.stdout));
            eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
            panic!("Server exited before the timeout");
        }
    }
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_backoffice_server(&["run", "--help"]);
    assert!(output.status.success(), "Run subcommand help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Start the server"), "{}", stdout);

    let output = run_backoffice_server(&["check", "--help"]);
    assert!(output.status.success(), "Check subcommand help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Check configuration"), "{}", stdout);
}
