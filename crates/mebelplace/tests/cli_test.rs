//! Integration tests for the `mebelplace` CLI binary.
//!
//! Argument parsing, config handling and exit codes run offline; session
//! flows run against a wiremock backend. Every test gets its own config
//! file and data directory so the user's real session is never touched.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Build a [`Command`] for the `mebelplace` binary with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let root = self.dir.path();
        let mut cmd = cargo_bin_cmd!("mebelplace");
        cmd.env("HOME", root)
            .env("XDG_CONFIG_HOME", root.join("config"))
            .env("XDG_DATA_HOME", root.join("data"))
            .env("MEBELPLACE_CONFIG", root.join("config.toml"))
            .env_remove("MEBELPLACE_API_URL")
            .env_remove("MEBELPLACE_OUTPUT")
            .env_remove("MEBELPLACE_INSECURE")
            .env_remove("MEBELPLACE_TIMEOUT")
            .env_remove("MEBELPLACE_PHONE")
            .env_remove("MEBELPLACE_PASSWORD")
            .env_remove("MEBELPLACE_CREDENTIAL_STORE")
            .env_remove("MEBELPLACE_DEFAULTS__TIMEOUT")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Command pointed at a mock server.
    fn api_cmd(&self, server: &MockServer) -> assert_cmd::Command {
        let mut cmd = self.cmd();
        cmd.env("MEBELPLACE_API_URL", server.uri());
        cmd
    }

    fn config_path(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a blocking command without stalling the mock server's runtime.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({ "data": data, "status": 200 })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "phone": "+77001234567", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "user": { "id": 3, "username": "master3" },
            "accessToken": "abc",
            "refreshToken": "r1",
            "expiresIn": 900
        }))))
        .expect(1)
        .mount(server)
        .await;
}

async fn login(env: &TestEnv, server: &MockServer) {
    let mut cmd = env.api_cmd(server);
    cmd.args(["login", "--phone", "+77001234567", "--password", "hunter2"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let env = TestEnv::new();
    let output = env.cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let env = TestEnv::new();
    env.cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("MebelPlace")
            .and(predicate::str::contains("login"))
            .and(predicate::str::contains("whoami"))
            .and(predicate::str::contains("api")),
    );
}

#[test]
fn test_version_flag() {
    let env = TestEnv::new();
    env.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mebelplace"));
}

#[test]
fn test_invalid_subcommand() {
    let env = TestEnv::new();
    env.cmd().arg("sofas").assert().code(2);
}

#[test]
fn test_completions_bash() {
    let env = TestEnv::new();
    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mebelplace"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_env() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_then_show() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "set", "api_url", "http://localhost:3000/api/v2"])
        .assert()
        .success();
    env.cmd()
        .args(["config", "set", "credential_store", "memory"])
        .assert()
        .success();

    let raw = std::fs::read_to_string(env.config_path()).unwrap();
    assert!(raw.contains("http://localhost:3000/api/v2"), "{raw}");

    let output = env.cmd().args(["config", "show", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["api_url"], "http://localhost:3000/api/v2");
    assert_eq!(shown["credential_store"], "memory");
    assert!(shown["credentials_file"].is_null());
}

#[test]
fn test_config_set_unknown_key_is_usage_error() {
    let env = TestEnv::new();
    let output = env
        .cmd()
        .args(["config", "set", "profile", "home"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

// ── Offline session state ───────────────────────────────────────────

#[test]
fn test_status_when_logged_out() {
    let env = TestEnv::new();
    let output = env.cmd().args(["status", "-o", "json"]).output().unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["authenticated"], false);
    assert_eq!(status["credential_store"], "file");
}

#[test]
fn test_whoami_requires_login() {
    let env = TestEnv::new();
    let output = env.cmd().arg("whoami").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Not logged in"));
}

#[test]
fn test_bad_api_url_is_rejected() {
    let env = TestEnv::new();
    let output = env
        .cmd()
        .args(["--api-url", "ftp://mebelplace.com.kz", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("unsupported scheme"));
}

#[test]
fn test_unreachable_backend_exits_with_connection_code() {
    let env = TestEnv::new();
    let output = env
        .cmd()
        .args(["--api-url", "http://127.0.0.1:1", "api", "get", "/requests"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

// ── Session flows against a mock backend ───────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_persists_session_across_runs() {
    let env = TestEnv::new();
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "id": 3, "username": "master3" }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = env.api_cmd(&server);
    cmd.args(["login", "--phone", "+77001234567", "--password", "hunter2"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Logged in as master3"));

    let credentials = env
        .dir
        .path()
        .join("data")
        .join("mebelplace")
        .join("credentials.json");
    assert!(credentials.exists(), "credential file not written");

    let mut cmd = env.api_cmd(&server);
    cmd.args(["whoami", "-o", "json"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let user: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(user["username"], "master3");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_login_is_auth_error() {
    let env = TestEnv::new();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "Invalid credentials", "code": "BAD_CREDS" })),
        )
        .mount(&server)
        .await;

    let mut cmd = env.api_cmd(&server);
    cmd.args(["login", "--phone", "+77001234567", "--password", "wrong"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Invalid credentials"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_clears_local_session() {
    let env = TestEnv::new();
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    login(&env, &server).await;

    let mut cmd = env.api_cmd(&server);
    cmd.arg("logout");
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let mut cmd = env.api_cmd(&server);
    cmd.args(["status", "-o", "json"]);
    let output = run(cmd).await;
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["authenticated"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_token_is_refreshed_transparently() {
    let env = TestEnv::new();
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "accessToken": "def",
            "refreshToken": "r2"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .and(query_param("status", "open"))
        .and(header("authorization", "Bearer def"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!([{ "id": 7, "title": "Sofa" }]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    login(&env, &server).await;

    let mut cmd = env.api_cmd(&server);
    cmd.args(["api", "get", "/requests", "-p", "status=open", "-o", "json"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let data: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(data[0]["title"], "Sofa");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_refresh_reports_session_expired() {
    let env = TestEnv::new();
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    login(&env, &server).await;

    let mut cmd = env.api_cmd(&server);
    cmd.args(["api", "get", "/chats"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Session expired"));

    let mut cmd = env.api_cmd(&server);
    cmd.args(["status", "-o", "json"]);
    let output = run(cmd).await;
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["authenticated"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rate_limit_exit_code() {
    let env = TestEnv::new();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/feed"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(json!({ "message": "Too many requests" })),
        )
        .mount(&server)
        .await;

    let mut cmd = env.api_cmd(&server);
    cmd.args(["api", "get", "/videos/feed"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("30s"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_post_sends_json_body() {
    let env = TestEnv::new();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({ "requestId": 7, "price": 120_000 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "created" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = env.api_cmd(&server);
    cmd.args([
        "api",
        "post",
        "/orders",
        "--data",
        r#"{"requestId": 7, "price": 120000}"#,
    ]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("OK"));
}
