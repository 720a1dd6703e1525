// crates/hookgate-delivery/tests/transport.rs
// ============================================================================
// Module: Reqwest Transport Tests
// Description: Real-socket behavior of the reqwest transport.
// ============================================================================
//! ## Overview
//! Uses `tiny_http` servers on ephemeral ports to check headers, redirect
//! handling, body caps, and connection failures.

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

use std::thread;
use std::time::Duration;

use hookgate_core::HttpMethod;
use hookgate_core::HttpRequest;
use hookgate_core::HttpTransport;
use hookgate_core::TransportError;
use hookgate_delivery::DEFAULT_MAX_RESPONSE_BYTES;
use hookgate_delivery::ReqwestTransport;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// POST request to `url` with a small JSON body.
fn post(url: String) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Post,
        url,
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("authorization".to_string(), "Bearer tok".to_string()),
        ],
        body: br#"{"ok":true}"#.to_vec(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn posts_body_and_headers() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        let auth = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_string());
        let method = request.method().to_string();
        let _ = request.respond(Response::from_string("{\"received\":true}").with_status_code(201));
        (method, body, auth)
    });

    let transport =
        ReqwestTransport::new(Duration::from_secs(2), DEFAULT_MAX_RESPONSE_BYTES).unwrap();
    let response = transport.execute(post(format!("http://{addr}/hook"))).await.unwrap();
    let (method, body, auth) = handle.join().unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.body, b"{\"received\":true}".to_vec());
    assert_eq!(method, "POST");
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(auth.as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let location = Header::from_bytes("Location", "http://127.0.0.1:9/elsewhere").unwrap();
            let _ = request.respond(Response::empty(302).with_header(location));
        }
    });
    let transport =
        ReqwestTransport::new(Duration::from_secs(2), DEFAULT_MAX_RESPONSE_BYTES).unwrap();
    let response = transport.execute(post(format!("http://{addr}/hook"))).await.unwrap();
    handle.join().unwrap();
    assert_eq!(response.status, 302);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(Response::from_string("x".repeat(4096)));
        }
    });
    let transport = ReqwestTransport::new(Duration::from_secs(2), 1024).unwrap();
    let error = transport.execute(post(format!("http://{addr}/hook"))).await.unwrap_err();
    handle.join().unwrap();
    assert!(matches!(error, TransportError::Body(_)));
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let addr = {
        let server = Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap()
    };
    let transport =
        ReqwestTransport::new(Duration::from_secs(2), DEFAULT_MAX_RESPONSE_BYTES).unwrap();
    let error = transport.execute(post(format!("http://{addr}/hook"))).await.unwrap_err();
    assert!(matches!(error, TransportError::Connect(_)));
}
