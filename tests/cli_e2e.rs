//! End-to-end CLI tests for the v2dl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary with config lookup pointed at an empty directory.
fn v2dl(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("v2dl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download albums from V2PH"))
        .stdout(predicate::str::contains("--ledger-policy"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("v2dl"));
}

/// Test that running without a URL is a usage error.
#[test]
fn test_binary_without_urls_fails() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .args(["--invalid-flag", "https://www.v2ph.com/album/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that only unsupported URLs is an error before any network access.
#[test]
fn test_binary_unsupported_urls_fail() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .args(["https://www.v2ph.com/tag/x", "ftp://www.v2ph.com/album/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No supported URLs"));
}

/// Test that an explicit config file that does not exist is reported.
#[test]
fn test_binary_missing_config_fails() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .args(["--config"])
        .arg(home.path().join("absent.toml"))
        .arg("https://www.v2ph.com/album/a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot load configuration"));
}

/// Test that unknown keys in the config file are rejected.
#[test]
fn test_binary_bad_config_key_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("v2dl").join("config.toml");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, "concurrency = 8\n").unwrap();

    v2dl(&home)
        .arg("https://www.v2ph.com/album/a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot load configuration"));
}

/// Test that out-of-range settings are rejected.
#[test]
fn test_binary_inverted_page_delay_fails() {
    let home = TempDir::new().unwrap();
    v2dl(&home)
        .args([
            "--page-delay-min",
            "5",
            "--page-delay-max",
            "1",
            "https://www.v2ph.com/album/a",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
