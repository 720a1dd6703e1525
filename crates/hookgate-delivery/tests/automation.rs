// crates/hookgate-delivery/tests/automation.rs
// ============================================================================
// Module: Automation Client Tests
// Description: Chat relay wire format and reply contract validation.
// ============================================================================
//! ## Overview
//! Validates the camelCase chat payload and `{ success, response? }` replies.

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
#![allow(dead_code, reason = "Common module may have unused helpers.")]

mod common;

use std::collections::BTreeMap;

use common::Step;
use common::destination;
use common::harness;
use common::no_jitter;
use hookgate_core::AuthDescriptor;
use hookgate_core::CircuitConfig;
use hookgate_core::ErrorKind;
use hookgate_delivery::AutomationClient;
use hookgate_delivery::AutomationReply;
use hookgate_delivery::ChatMessage;
use serde_json::Value;
use serde_json::json;

/// Automation backend URL.
const BACKEND: &str = "https://automation.example.com/webhook/chat";

/// Sample chat message with one extra field.
fn message() -> ChatMessage {
    let mut extra = BTreeMap::new();
    extra.insert("userId".to_string(), json!("u-1"));
    ChatMessage {
        message: "where is my order?".to_string(),
        session_id: "s-1".to_string(),
        source: "web".to_string(),
        chat_id: "c-9".to_string(),
        timestamp: "2026-03-01T12:00:00Z".to_string(),
        extra,
    }
}

#[tokio::test(start_paused = true)]
async fn relays_camel_case_message_and_parses_reply() {
    let transport = common::ScriptedTransport::new();
    transport.script(
        BACKEND,
        vec![Step::Respond(200, br#"{"success":true,"response":"On its way"}"#.to_vec())],
    );
    let h = harness(transport, CircuitConfig::default(), no_jitter());
    let mut backend = destination("automation", BACKEND, &["message.sent"]);
    backend.auth = AuthDescriptor::Bearer {
        token: "n8n-token".to_string(),
    };
    let client = AutomationClient::new(h.client.clone(), backend);

    let reply = client.send_chat(&message()).await.unwrap();
    assert_eq!(
        reply,
        AutomationReply {
            success: true,
            response: Some("On its way".to_string())
        }
    );
    let sent = &h.transport.requests_to(BACKEND)[0];
    let body: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["sessionId"], "s-1");
    assert_eq!(body["chatId"], "c-9");
    assert_eq!(body["userId"], "u-1");
    assert!(sent.headers.contains(&("authorization".to_string(), "Bearer n8n-token".to_string())));
}

#[tokio::test(start_paused = true)]
async fn unexpected_reply_shape_is_a_validation_error() {
    let transport = common::ScriptedTransport::with_fallback(Step::Respond(
        200,
        br#"{"ok":"yes"}"#.to_vec(),
    ));
    let h = harness(transport, CircuitConfig::default(), no_jitter());
    let client =
        AutomationClient::new(h.client.clone(), destination("automation", BACKEND, &["*"]));
    let error = client.send_chat(&message()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(h.transport.calls(), 1);
}
