// crates/hookgate-core/tests/audit.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: JSON-line serialization of audit events.
// ============================================================================
//! ## Overview
//! Ensures file sinks append one tagged JSON object per event.

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

use hookgate_core::AuditEvent;
use hookgate_core::AuditSink;
use hookgate_core::FileAuditSink;
use hookgate_core::ReceiverId;
use hookgate_core::SwitchReason;
use serde_json::Value;

#[test]
fn file_sink_appends_tagged_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = FileAuditSink::new(&path).unwrap();
    sink.record(&AuditEvent::FailoverSwitch {
        timestamp_ms: 1,
        from: ReceiverId::new("primary"),
        to: ReceiverId::new("backup-1"),
        reason: SwitchReason::Unhealthy,
    });
    sink.record(&AuditEvent::SignatureRejected {
        timestamp_ms: 2,
        path: "/webhooks/deploy".to_string(),
    });

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "failover_switch");
    assert_eq!(lines[0]["reason"], "unhealthy");
    assert_eq!(lines[0]["to"], "backup-1");
    assert_eq!(lines[1]["event"], "signature_rejected");
}
