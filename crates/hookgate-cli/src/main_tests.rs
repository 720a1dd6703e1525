// crates/hookgate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads and secret resolution.
// Purpose: Ensure CLI inputs fail closed on oversized files and missing secrets.
// Dependencies: hookgate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit` and `resolve_secret`.

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
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hookgate_core::sign;

use super::ReadLimitError;
use super::SecretArgs;
use super::read_bytes_with_limit;
use super::resolve_secret;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn temp_file(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("hookgate-cli-{label}-{nanos}.bin"));
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_accepts_exact_limit() {
    let path = temp_file("exact");
    fs::write(&path, b"12345").unwrap();
    let bytes = read_bytes_with_limit(&path, 5).unwrap();
    assert_eq!(bytes, b"12345");
    let _ = fs::remove_file(&path);
}

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let path = temp_file("oversized");
    fs::write(&path, b"123456").unwrap();
    let err = read_bytes_with_limit(&path, 5).unwrap_err();
    assert!(matches!(err, ReadLimitError::TooLarge { size: 6, limit: 5 }));
    let _ = fs::remove_file(&path);
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let err = read_bytes_with_limit(&temp_file("missing"), 5).unwrap_err();
    assert!(matches!(err, ReadLimitError::Io(_)));
}

#[test]
fn inline_secret_signs_like_the_server() {
    let args = SecretArgs {
        secret: Some("topsecret".to_string()),
        secret_env: None,
    };
    let secret = resolve_secret(&args, &no_env).unwrap();
    let signature = sign(b"payload", &secret).unwrap();
    assert!(signature.starts_with("sha256="));
    assert_eq!(signature.len(), "sha256=".len() + 64);
}

#[test]
fn env_secret_is_looked_up_by_name() {
    let args = SecretArgs {
        secret: None,
        secret_env: Some("DEPLOY_SECRET".to_string()),
    };
    let lookup = |name: &str| (name == "DEPLOY_SECRET").then(|| "from-env".to_string());
    assert!(resolve_secret(&args, &lookup).is_ok());

    let err = resolve_secret(&args, &no_env).unwrap_err();
    assert_eq!(err.to_string(), "DEPLOY_SECRET is not set in the environment");
}

#[test]
fn empty_secret_is_rejected() {
    let args = SecretArgs {
        secret: Some(String::new()),
        secret_env: None,
    };
    assert!(resolve_secret(&args, &no_env).is_err());
}
