// crates/hookgate-server/tests/http.rs
// ============================================================================
// Module: HTTP Surface Tests
// Description: Ingress, relay, signed webhooks, status, and admin endpoints.
// ============================================================================
//! ## Overview
//! Starts the service on an ephemeral port and drives it with reqwest.

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

use std::sync::Arc;

use common::RecordingTransport;
use common::TestServer;
use hookgate_core::SIGNATURE_HEADER;
use hookgate_core::SigningSecret;
use hookgate_core::sign;
use serde_json::Value;
use serde_json::json;

const BASE: &str = r#"
[server]
bind = "127.0.0.1:0"
admin_token = { value = "admin-token" }

[audit]
sink = "none"

[signature]
secret = { env = "DEPLOY_SECRET" }

[[destinations]]
id = "tracker"
url = "http://tracker.test/hooks"
events = ["bug.created"]
auth = { type = "bearer", token = { env = "TRACKER_TOKEN" } }

[[destinations]]
id = "slack"
url = "http://slack.test/hooks"
shape = "slack"
events = ["*"]

[destinations.filters]
severity = ["high", "critical"]
"#;

const SECRETS: &[(&str, &str)] =
    &[("DEPLOY_SECRET", "deploy-secret"), ("TRACKER_TOKEN", "tracker-token")];

fn bug_event(severity: &str) -> Value {
    json!({
        "event_type": "bug.created",
        "event_id": "evt-1",
        "subject": {
            "title": "Login fails",
            "description": "500 on submit",
            "status": "open",
            "severity": severity,
            "assignee": "sam"
        }
    })
}

#[tokio::test]
async fn health_reports_healthy_service() {
    let server = TestServer::start(BASE, SECRETS).await;
    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dependencies"]["destinations"], 2);
    assert_eq!(body["dependencies"]["automation"], false);
    assert!(body["dependencies"].get("failover").is_none());
    server.stop().await;
}

#[tokio::test]
async fn events_fan_out_to_matching_destinations() {
    let server = TestServer::start(BASE, SECRETS).await;
    let response =
        server.client.post(server.url("/events")).json(&bug_event("high")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["matched"], 2);
    assert_eq!(report["delivered"], 2);

    let tracker = server.transport.requests_to("http://tracker.test/hooks");
    assert_eq!(tracker.len(), 1);
    let bearer = ("authorization".to_string(), "Bearer tracker-token".to_string());
    assert!(tracker[0].headers.contains(&bearer));
    let generic: Value = serde_json::from_slice(&tracker[0].body).unwrap();
    assert_eq!(generic["event_id"], "evt-1");

    let slack = server.transport.requests_to("http://slack.test/hooks");
    let slack: Value = serde_json::from_slice(&slack[0].body).unwrap();
    assert_eq!(slack["attachments"][0]["color"], "warning");
    assert_eq!(slack["attachments"][0]["fields"][2]["value"], "sam");
    server.stop().await;
}

#[tokio::test]
async fn filtered_destination_is_skipped() {
    let server = TestServer::start(BASE, SECRETS).await;
    let report: Value = server
        .client
        .post(server.url("/events"))
        .json(&bug_event("low"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["matched"], 1);
    assert_eq!(report["outcomes"][0]["destination_id"], "tracker");
    assert!(server.transport.requests_to("http://slack.test/hooks").is_empty());
    server.stop().await;
}

#[tokio::test]
async fn malformed_event_is_rejected() {
    let server = TestServer::start(BASE, SECRETS).await;
    let response =
        server.client.post(server.url("/events")).body("{not json").send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("invalid event"));
    server.stop().await;
}

#[tokio::test]
async fn signed_deploy_webhook_reaches_handler() {
    let server = TestServer::start(BASE, SECRETS).await;
    let payload = br#"{"ref":"refs/heads/main","repository":{"full_name":"acme/app"}}"#;
    let secret = SigningSecret::new(b"deploy-secret".to_vec()).unwrap();
    let signature = sign(payload, &secret).unwrap();

    let response = server
        .client
        .post(server.url("/webhooks/deploy"))
        .header(SIGNATURE_HEADER, signature)
        .body(payload.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let notices = server.deployments.notices.lock().unwrap().clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].repository.as_deref(), Some("acme/app"));
    assert_eq!(notices[0].git_ref.as_deref(), Some("refs/heads/main"));
    server.stop().await;
}

#[tokio::test]
async fn deploy_rejections_are_generic() {
    let server = TestServer::start(BASE, SECRETS).await;
    let payload = br#"{"ref":"refs/heads/main"}"#;
    let wrong = SigningSecret::new(b"other-secret".to_vec()).unwrap();
    let cases = [
        None,
        Some(sign(payload, &wrong).unwrap()),
        Some("sha256=zz".to_string()),
        Some("md5=abc".to_string()),
    ];
    for header in cases {
        let mut request = server.client.post(server.url("/webhooks/deploy")).body(payload.to_vec());
        if let Some(header) = header {
            request = request.header(SIGNATURE_HEADER, header);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 401);
        assert_eq!(response.text().await.unwrap(), r#"{"error":"unauthorized"}"#);
    }
    assert!(server.deployments.notices.lock().unwrap().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn deploy_without_configured_secret_rejects_everything() {
    let toml = "[audit]\nsink = \"none\"\n";
    let server = TestServer::start(toml, &[]).await;
    let response = server
        .client
        .post(server.url("/webhooks/deploy"))
        .header(SIGNATURE_HEADER, "sha256=00")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    server.stop().await;
}

const CHAT: &str = r#"
[audit]
sink = "none"

[automation]
url = "http://automation.test/chat"
auth = { type = "api_key", header = "X-Api-Key", value = { value = "automation-key" } }
"#;

fn chat_message() -> Value {
    json!({
        "message": "hello",
        "sessionId": "s-1",
        "source": "web",
        "chatId": "c-1",
        "timestamp": "2026-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn chat_messages_are_relayed() {
    let transport = Arc::new(RecordingTransport::default());
    transport.respond("http://automation.test/chat", 200, r#"{"success":true,"response":"hi"}"#);
    let server = TestServer::start_with(CHAT, &[], transport).await;
    let response = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(response.status(), 200);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply, json!({"success": true, "response": "hi"}));

    let sent = server.transport.requests_to("http://automation.test/chat");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].headers.contains(&("x-api-key".to_string(), "automation-key".to_string())));
    let body: Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(body["sessionId"], "s-1");
    server.stop().await;
}

#[tokio::test]
async fn invalid_backend_reply_is_a_bad_gateway() {
    let transport = Arc::new(RecordingTransport::default());
    transport.respond("http://automation.test/chat", 200, r#"{"ok":1}"#);
    let server = TestServer::start_with(CHAT, &[], transport).await;
    let response = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "validation");
    assert_eq!(server.transport.requests_to("http://automation.test/chat").len(), 1);
    server.stop().await;
}

#[tokio::test]
async fn chat_without_backend_is_unavailable() {
    let server = TestServer::start(BASE, SECRETS).await;
    let response = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(response.status(), 503);
    server.stop().await;
}

#[tokio::test]
async fn status_endpoints_report_metrics_and_destinations() {
    let server = TestServer::start(BASE, SECRETS).await;
    server.client.post(server.url("/events")).json(&bug_event("critical")).send().await.unwrap();

    let metrics = server.get_json("/status/metrics").await;
    assert_eq!(metrics["total_attempts"], 2);
    assert_eq!(metrics["successes"], 2);

    let listing = server.client.get(server.url("/status/destinations")).send().await.unwrap();
    let text = listing.text().await.unwrap();
    assert!(!text.contains("tracker-token"));
    let listing: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(listing["destinations"][0]["auth"], "bearer");
    assert_eq!(listing["destinations"][0]["circuit"]["state"], "closed");
    assert_eq!(listing["destinations"][1]["shape"], "slack");

    let failover = server.client.get(server.url("/status/failover")).send().await.unwrap();
    assert_eq!(failover.status(), 404);
    server.stop().await;
}

#[tokio::test]
async fn admin_destination_replace_requires_token() {
    let server = TestServer::start(BASE, SECRETS).await;
    let replacement = json!([{
        "id": "datadog",
        "url": "http://datadog.test/api",
        "shape": "datadog",
        "events": ["*"],
        "auth": { "type": "api_key", "header": "DD-API-KEY", "value": { "value": "dd" } }
    }]);

    let denied = server.put_json("/admin/destinations", &replacement).await;
    assert_eq!(denied.status(), 401);

    let accepted = server
        .client
        .put(server.url("/admin/destinations"))
        .bearer_auth("admin-token")
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 200);
    let listing = server.get_json("/status/destinations").await;
    assert_eq!(listing["destinations"].as_array().unwrap().len(), 1);
    assert_eq!(listing["destinations"][0]["id"], "datadog");

    let invalid = server
        .client
        .put(server.url("/admin/destinations"))
        .bearer_auth("admin-token")
        .json(&json!([{ "id": "x", "url": "http://x.test", "events": [] }]))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);
    server.stop().await;
}

const FAILOVER: &str = r#"
[server]
admin_token = { value = "admin-token" }

[audit]
sink = "none"

[failover]
interval_ms = 3600000

[[failover.receivers]]
id = "primary"
url = "http://primary.test/webhook"
health_url = "http://primary.test/health"

[[failover.receivers]]
id = "backup"
url = "http://backup.test/webhook"
health_url = "http://backup.test/health"
"#;

#[tokio::test]
async fn admin_failover_switches_active_receiver() {
    let server = TestServer::start(FAILOVER, &[]).await;
    let request = json!({ "target": "backup" });

    let denied = server
        .client
        .post(server.url("/admin/failover"))
        .bearer_auth("wrong")
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let switched: Value = server
        .client
        .post(server.url("/admin/failover"))
        .bearer_auth("admin-token")
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(switched["active"], "backup");
    assert_eq!(switched["last_switch_reason"], "manual");

    let status = server.get_json("/status/failover").await;
    assert_eq!(status["active"], "backup");
    assert_eq!(status["receivers"][0]["role"], "primary");

    let unknown = server
        .client
        .post(server.url("/admin/failover"))
        .bearer_auth("admin-token")
        .json(&json!({ "target": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);

    let health = server.get_json("/health").await;
    assert_eq!(health["dependencies"]["failover"]["active"], "backup");
    server.stop().await;
}

const FAILING_BACKEND: &str = r#"
[audit]
sink = "none"

[circuit]
failure_threshold = 1
cooldown_ms = 600000

[automation]
url = "http://automation.test/chat"
retry = { max_attempts = 1 }

[[destinations]]
id = "tracker"
url = "http://tracker.test/hooks"
events = ["*"]
"#;

#[tokio::test]
async fn destination_replace_keeps_open_automation_circuit() {
    let transport = Arc::new(RecordingTransport::default());
    transport.respond("http://automation.test/chat", 500, "{}");
    let server = TestServer::start_with(FAILING_BACKEND, &[], transport).await;

    let first = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(first.status(), 502);
    let second = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(second.status(), 503);
    assert_eq!(server.transport.requests_to("http://automation.test/chat").len(), 1);

    let replacement = json!([{ "id": "pager", "url": "http://pager.test/hooks", "events": ["*"] }]);
    let replaced = server.put_json("/admin/destinations", &replacement).await;
    assert_eq!(replaced.status(), 200);

    let third = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(third.status(), 503);
    let body: Value = third.json().await.unwrap();
    assert_eq!(body["kind"], "circuit_open");
    assert_eq!(server.transport.requests_to("http://automation.test/chat").len(), 1);
    server.stop().await;
}

#[tokio::test]
async fn destinations_cannot_share_the_automation_circuit() {
    let transport = Arc::new(RecordingTransport::default());
    transport.respond("http://automation.test/chat", 200, r#"{"success":true,"response":"ok"}"#);
    transport.respond("http://sink.test/hooks", 500, "{}");
    let server = TestServer::start_with(FAILING_BACKEND, &[], transport).await;

    let replacement = json!([{
        "id": "automation",
        "url": "http://sink.test/hooks",
        "events": ["*"],
        "retry": { "max_attempts": 1 }
    }]);
    let rejected = server.put_json("/admin/destinations", &replacement).await;
    assert_eq!(rejected.status(), 400);
    let body: Value = rejected.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("reserved"));

    let report: Value = server.post_json("/events", &bug_event("high")).await.json().await.unwrap();
    assert_eq!(report["outcomes"][0]["destination_id"], "tracker");
    assert!(server.transport.requests_to("http://sink.test/hooks").is_empty());

    let chat = server.post_json("/chat/messages", &chat_message()).await;
    assert_eq!(chat.status(), 200);
    assert_eq!(server.transport.requests_to("http://automation.test/chat").len(), 1);
    server.stop().await;
}
