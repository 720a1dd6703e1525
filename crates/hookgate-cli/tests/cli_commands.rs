// crates/hookgate-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for config validation and signature commands.
// Purpose: Ensure the binary reports results through exit codes and stdout.
// Dependencies: hookgate-cli binary
// ============================================================================
//! ## Overview
//! Runs the `hookgate` binary against temporary files.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn hookgate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hookgate"))
}

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("hookgate-cli-{label}-{nanos}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn cleanup(path: &PathBuf) {
    let _ = fs::remove_dir_all(path);
}

fn run(args: &[&str]) -> Output {
    Command::new(hookgate_bin())
        .args(args)
        .env_remove("HOOKGATE_CONFIG")
        .output()
        .expect("run hookgate")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_validate_reports_summary() {
    let root = temp_root("validate");
    let path = root.join("hookgate.toml");
    let config = r#"
[[destinations]]
id = "tracker"
url = "https://tracker.example.com/hooks"
events = ["bug.created"]
"#;
    fs::write(&path, config.trim()).unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "config ok: 1 destination(s), failover disabled, automation disabled"
    );
    cleanup(&root);
}

#[test]
fn config_validate_rejects_public_bind_without_admin_token() {
    let root = temp_root("public-bind");
    let path = root.join("hookgate.toml");
    fs::write(&path, "[server]\nbind = \"0.0.0.0:8080\"\n").unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "stderr: {stderr}");
    cleanup(&root);
}

#[test]
fn signature_sign_then_verify() {
    let root = temp_root("signature");
    let payload = root.join("payload.json");
    fs::write(&payload, br#"{"ref":"refs/heads/main"}"#).unwrap();
    let file = payload.to_str().unwrap();

    let signed = run(&["signature", "sign", "--secret", "deploy-secret", "--file", file]);
    assert!(signed.status.success());
    let signature = stdout(&signed);
    assert!(signature.starts_with("sha256="));

    let verified = run(&[
        "signature",
        "verify",
        "--secret",
        "deploy-secret",
        "--file",
        file,
        "--header",
        signature.as_str(),
    ]);
    assert!(verified.status.success());
    assert_eq!(stdout(&verified), "signature valid");

    let rejected = run(&[
        "signature",
        "verify",
        "--secret",
        "other",
        "--file",
        file,
        "--header",
        signature.as_str(),
    ]);
    assert!(!rejected.status.success());
    assert_eq!(stdout(&rejected), "signature invalid");
    cleanup(&root);
}

#[test]
fn signature_secret_can_come_from_environment() {
    let root = temp_root("signature-env");
    let payload = root.join("payload.json");
    fs::write(&payload, b"{}").unwrap();
    let file = payload.to_str().unwrap();

    let inline = run(&["signature", "sign", "--secret", "s3cret", "--file", file]);
    let from_env = Command::new(hookgate_bin())
        .args(["signature", "sign", "--secret-env", "HOOKGATE_TEST_SECRET", "--file", file])
        .env("HOOKGATE_TEST_SECRET", "s3cret")
        .output()
        .unwrap();
    assert!(from_env.status.success());
    assert_eq!(stdout(&inline), stdout(&from_env));

    let missing = Command::new(hookgate_bin())
        .args(["signature", "sign", "--secret-env", "HOOKGATE_TEST_SECRET", "--file", file])
        .env_remove("HOOKGATE_TEST_SECRET")
        .output()
        .unwrap();
    assert!(!missing.status.success());
    cleanup(&root);
}

#[test]
fn version_flag_prints_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("hookgate "));
}
