//! Integration tests for the targe CLI.
//!
//! Each test points HOME at a temporary directory so the user's real
//! `~/.targe` is never read or written. None of them reach AWS.

#![allow(deprecated)] // cargo_bin is deprecated but works fine for standard builds

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn targe(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("targe").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("TARGE_REQUIREMENTS_DIR");
    cmd
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aws"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("requirements"))
        .stdout(predicate::str::contains("--no-color"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_aws_users_help_shows_flags() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["aws", "users", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--user"))
        .stdout(predicate::str::contains("--group"))
        .stdout(predicate::str::contains("--operation"))
        .stdout(predicate::str::contains("--policy-option"))
        .stdout(predicate::str::contains("--terraform"));
}

#[test]
fn test_missing_subcommand_fails() {
    let home = TempDir::new().unwrap();
    targe(&home).assert().failure();
}

// ============================================================================
// Flag validation (fails before any AWS call)
// ============================================================================

#[test]
fn test_group_operation_for_role_is_rejected() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["aws", "roles", "--operation", "add_to_group"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Unsupported operation 'add_to_group'"))
        .stderr(predicate::str::contains("attach_custom_policy"));
}

#[test]
fn test_unknown_operation_slug_is_rejected() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["aws", "users", "--operation", "grant_everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported operation 'grant_everything'"));
}

#[test]
fn test_unknown_policy_option_is_rejected() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["aws", "roles", "--policy-option", "everywhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown policy option 'everywhere'"));
}

#[test]
fn test_policy_with_custom_policy_conflicts() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args([
            "aws",
            "users",
            "--operation",
            "attach_custom_policy",
            "--policy",
            "ReadOnlyAccess",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflicting flags"));
}

#[test]
fn test_service_without_resource_option_conflicts() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args([
            "aws",
            "groups",
            "--service",
            "AWS::S3::Bucket",
            "--policy-option",
            "without_resource",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflicting flags"));
}

#[test]
fn test_roles_do_not_accept_group_flag() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["aws", "roles", "--group", "admins"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--group"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["config", "set", "openai_model", "gpt-4o-mini"])
        .assert()
        .success();

    let written = fs::read_to_string(home.path().join(".targe").join("config.yml")).unwrap();
    assert!(written.contains("openai_model: \"gpt-4o-mini\""));

    targe(&home)
        .args(["config", "get", "openai_model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("openai_model=gpt-4o-mini\n"));
}

#[test]
fn test_config_get_reports_default_model() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["config", "get", "openai_model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("openai_model=gpt-4o"));
}

#[test]
fn test_config_get_unset_api_key_is_empty() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["config", "get", "openai_api_key"])
        .assert()
        .success()
        .stdout(predicate::str::diff("openai_api_key=\n"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    targe(&home)
        .args(["config", "set", "region", "eu-central-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key 'region'"));

    assert!(!home.path().join(".targe").join("config.yml").exists());
}

#[test]
fn test_malformed_config_is_reported() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".targe");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), "- not\n- a mapping\n").unwrap();

    targe(&home)
        .args(["config", "get", "openai_model"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}
