// crates/hookgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Hookgate Interfaces
// Description: Backend-agnostic seams for HTTP transport, attempt recording, and audit.
// Purpose: Define the contract surfaces used by the delivery and failover runtimes.
// Dependencies: async-trait, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces decouple the resilience state machines from concrete HTTP
//! clients and logging pipelines. Tests substitute scripted transports and
//! in-memory sinks; production wires reqwest and JSON-line audit sinks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::attempt::DeliveryAttempt;
use crate::runtime::audit::AuditEvent;

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// HTTP method used by outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Single outbound HTTP request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute target URL.
    pub url: String,
    /// Header name/value pairs in insertion order.
    pub headers: Vec<(String, String)>,
    /// Request body bytes.
    pub body: Vec<u8>,
    /// Deadline for this request.
    pub timeout: Duration,
}

/// Response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Transport-level failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,
    /// Response body could not be read.
    #[error("response body error: {0}")]
    Body(String),
}

/// Executes HTTP requests on behalf of the delivery client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no complete response was received.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// SECTION: Attempt Recording
// ============================================================================

/// Receives one record per network attempt.
pub trait AttemptRecorder: Send + Sync {
    /// Records a completed attempt.
    fn record(&self, attempt: DeliveryAttempt);
}

/// Recorder that discards attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl AttemptRecorder for NoopRecorder {
    fn record(&self, _attempt: DeliveryAttempt) {}
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Sink for structured audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}
