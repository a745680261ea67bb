//! End-to-end CLI tests for the fetcher binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// A command isolated from the user's config file and log settings.
fn fetcher(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fetcher").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let config_home = TempDir::new().unwrap();
    fetcher(&config_home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download one file over HTTP(S)"))
        .stdout(predicate::str::contains("--output-dir"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let config_home = TempDir::new().unwrap();
    fetcher(&config_home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetcher"));
}

#[test]
fn test_binary_missing_address_is_usage_error() {
    let config_home = TempDir::new().unwrap();
    fetcher(&config_home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<ADDRESS>"));
}

#[test]
fn test_binary_invalid_address_exits_two() {
    let config_home = TempDir::new().unwrap();
    fetcher(&config_home)
        .args(["ftp://example.com/app.apk", "--skip-connectivity-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Not a valid http(s) address"));
}

#[test]
fn test_binary_blank_address_exits_two() {
    let config_home = TempDir::new().unwrap();
    fetcher(&config_home)
        .args(["   ", "--skip-connectivity-check"])
        .assert()
        .code(2);
}

#[test]
fn test_binary_bad_config_file_exits_two() {
    let config_home = TempDir::new().unwrap();
    let config_path = config_home.path().join("bad.toml");
    std::fs::write(&config_path, "connect_timeout_secs = 0\n").unwrap();

    fetcher(&config_home)
        .arg("example.com/app.apk")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("connect_timeout_secs"));
}

#[tokio::test]
async fn test_binary_downloads_into_output_dir() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/files/PeerGrading.apk"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"apk-bytes".to_vec()))
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/files/PeerGrading.apk", mock_server.uri());

    let mut cmd = fetcher(&config_home);
    cmd.arg(&url)
        .arg("-o")
        .arg(out_dir.path())
        .arg("--skip-connectivity-check");
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .success()
        .stdout(predicate::str::contains("PeerGrading.apk"));

    let saved = out_dir.path().join("PeerGrading.apk");
    assert_eq!(std::fs::read(saved).unwrap(), b"apk-bytes");
}

#[tokio::test]
async fn test_binary_http_error_exits_one_and_leaves_no_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/gone.apk", mock_server.uri());

    let mut cmd = fetcher(&config_home);
    cmd.arg(&url)
        .arg("-o")
        .arg(out_dir.path())
        .arg("--skip-connectivity-check");
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .code(1)
        .stderr(predicate::str::contains("Download failed: 404:"));

    assert!(!out_dir.path().join("gone.apk").exists());
}

#[tokio::test]
async fn test_binary_json_output_ends_with_result_line() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4096]))
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/data.bin", mock_server.uri());

    let mut cmd = fetcher(&config_home);
    cmd.arg(&url)
        .arg("-o")
        .arg(out_dir.path())
        .args(["--json", "--skip-connectivity-check", "-q"]);
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let json_lines: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let first = json_lines.first().unwrap();
    assert_eq!(first["event"], "progress");
    assert_eq!(first["phase"], "opening");
    let last = json_lines.last().unwrap();
    assert_eq!(last["event"], "complete");
    assert_eq!(last["outcome"], "success");
    assert_eq!(last["bytes_transferred"], 4096);
    assert_eq!(last["response_code"], 200);
}

#[tokio::test]
async fn test_binary_simulated_full_disk_exits_one() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let config_dir = config_home.path().join("fetcher");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "simulate_exhaustion = true\ncheck_connectivity = false\n",
    )
    .unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/full.apk", mock_server.uri());

    let mut cmd = fetcher(&config_home);
    cmd.arg(&url).arg("-o").arg(out_dir.path());
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .code(1)
        .stderr(predicate::str::contains("insufficient space"));
}
