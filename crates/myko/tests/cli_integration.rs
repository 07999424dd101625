//! CLI integration tests for the myko command-line interface.
//!
//! Every command runs with `MYKO_CONFIG_DIR` pointed at a temporary
//! directory so the user's real config and logs are never touched. HTTP
//! commands run against a local mock server.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the myko binary with an isolated environment.
fn myko(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("myko").unwrap();
    cmd.env("MYKO_CONFIG_DIR", config_dir.path())
        .env_remove("MYKO_CONFIG")
        .env_remove("MYKO_BASE_URL")
        .env_remove("MYKO_USERNAME")
        .env_remove("MYKO_PASSWORD");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Myko"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("account"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("states"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("myko"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let dir = TempDir::new().unwrap();
    myko(&dir).arg("frobnicate").assert().code(2);
}

#[test]
fn test_get_requires_path() {
    let dir = TempDir::new().unwrap();
    myko(&dir).arg("get").assert().code(2);
}

#[test]
fn test_bad_query_pair_is_usage_error() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .args(["get", "items", "--query", "novalue"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("key=value"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("myko.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    myko(&dir).args(["config", "init"]).assert().success();
    assert!(dir.path().join("myko.toml").is_file());

    myko(&dir)
        .args(["config", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    myko(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_init_explicit_path() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("custom").join("other.toml");
    myko(&dir)
        .arg("--config")
        .arg(&target)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(target.is_file());
}

#[test]
fn test_config_show_applies_overrides_and_redacts() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("myko.toml"),
        "[auth]\nusername = \"me@example.com\"\npassword = \"hunter2\"\n",
    )
    .unwrap();

    myko(&dir)
        .args(["--json", "--timeout", "7", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"timeout_secs\": 7"))
        .stdout(predicate::str::contains("me@example.com"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_invalid_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("myko.toml"), "[retry]\nmax_attempts = 0\n").unwrap();

    myko(&dir).args(["config", "show"]).assert().code(8);
}

#[test]
fn test_invalid_override_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .args(["--timeout", "0", "config", "show"])
        .assert()
        .code(8);
}

#[test]
fn test_missing_explicit_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["config", "show"])
        .assert()
        .code(8);
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_devices_without_username_is_auth_error() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("devices")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no username configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_prints_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items/1"))
        .and(query_param("expansions", "state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--base-url")
        .arg(format!("{}/v1", server.uri()))
        .args(["get", "items/1", "--query", "expansions=state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"a\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_prints_html_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Hub</title></head><body><p>All   good</p></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--base-url")
        .arg(format!("{}/v1", server.uri()))
        .args(["get", "page"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Hub"))
        .stdout(predicate::str::contains("All good"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_not_found_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--base-url")
        .arg(format!("{}/v1", server.uri()))
        .args(["get", "missing"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_retries_exhausted_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--base-url")
        .arg(format!("{}/v1", server.uri()))
        .args(["--max-attempts", "2", "get", "down"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Retries exhausted after 2 attempts"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_malformed_json_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{oops", "application/json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    myko(&dir)
        .arg("--base-url")
        .arg(format!("{}/v1", server.uri()))
        .args(["get", "broken"])
        .assert()
        .code(6);
}

#[test]
fn test_get_connection_refused_exit_code() {
    let dir = TempDir::new().unwrap();
    myko(&dir)
        .args(["--base-url", "http://127.0.0.1:1/v1", "--max-attempts", "1"])
        .args(["get", "anything"])
        .assert()
        .code(4);
}
