// crates/hookgate-delivery/src/transport.rs
// ============================================================================
// Module: Reqwest Transport
// Description: HTTP transport backed by an async reqwest client.
// Purpose: Execute outbound requests with redirects disabled and bounded bodies.
// Dependencies: async-trait, reqwest, hookgate-core
// ============================================================================

//! ## Overview
//! [`ReqwestTransport`] implements [`HttpTransport`] for production use.
//! Invariants:
//! - Redirects are never followed; 3xx responses are returned as-is.
//! - Response bodies are capped at the configured byte limit.
//! - Every request carries its own timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use hookgate_core::HttpMethod;
use hookgate_core::HttpRequest;
use hookgate_core::HttpResponse;
use hookgate_core::HttpTransport;
use hookgate_core::TransportError;
use reqwest::Client;
use reqwest::Method;
use reqwest::redirect::Policy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default response body cap (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Async reqwest transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Shared connection pool.
    client: Client,
    /// Response body cap in bytes.
    max_response_bytes: usize,
}

impl ReqwestTransport {
    /// Builds a transport with the given connect timeout and body cap.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the client cannot be built.
    pub fn new(
        connect_timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(Policy::none())
            .user_agent(concat!("hookgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.client.request(method, &request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }
        let mut response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_error)? {
            if body.len().saturating_add(chunk.len()) > self.max_response_bytes {
                return Err(TransportError::Body(format!(
                    "response exceeds {} bytes",
                    self.max_response_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(HttpResponse {
            status,
            body,
        })
    }
}

/// Classifies a reqwest error.
fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}
