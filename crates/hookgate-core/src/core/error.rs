// crates/hookgate-core/src/core/error.rs
// ============================================================================
// Module: Hookgate Delivery Errors
// Description: Error taxonomy for outbound delivery and inbound authentication.
// Purpose: Classify failures into retryable and terminal categories.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`WebhookError`] is the single error type surfaced by delivery, fan-out,
//! and signature verification. Each variant maps to a stable [`ErrorKind`]
//! label used by metrics and the status surface.
//! Invariants:
//! - Only `Network`, `Timeout`, and 5xx/429 `Http` errors are retryable.
//! - `CircuitOpen` is never produced after a network call was made.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::DestinationId;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable classification label for delivery errors.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport-level failure before a response was received.
    Network,
    /// Per-attempt or overall deadline exceeded.
    Timeout,
    /// Non-success HTTP status.
    Http,
    /// Success status with a malformed body.
    Validation,
    /// Inbound authentication failure.
    Auth,
    /// Circuit breaker rejected the send without a network call.
    CircuitOpen,
    /// Destination configuration is unusable.
    InvalidDestination,
    /// Internal failure unrelated to the remote endpoint.
    Internal,
}

impl ErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Http => "http",
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::CircuitOpen => "circuit_open",
            Self::InvalidDestination => "invalid_destination",
            Self::Internal => "internal",
        }
    }
}

// ============================================================================
// SECTION: Webhook Error
// ============================================================================

/// Errors returned by webhook delivery and verification.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Auth` carries no detail so rejections are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Connection, DNS, or body transfer failure.
    #[error("network error: {0}")]
    Network(String),
    /// Request exceeded its deadline.
    #[error("request timed out after {elapsed_ms} ms")]
    Timeout {
        /// Milliseconds elapsed before the deadline fired.
        elapsed_ms: u64,
    },
    /// Remote endpoint answered with a non-success status.
    #[error("http status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Whether the status class permits a retry.
        retryable: bool,
    },
    /// Success status with a body that failed schema validation.
    #[error("response validation failed: {0}")]
    Validation(String),
    /// Inbound request failed authentication.
    #[error("authentication failed")]
    Auth,
    /// Circuit breaker is open for the destination.
    #[error("circuit open for destination {destination}")]
    CircuitOpen {
        /// Destination whose circuit rejected the send.
        destination: DestinationId,
    },
    /// Destination configuration cannot be used for delivery.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
    /// Internal failure (payload formatting, task join).
    #[error("internal delivery failure: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Builds an HTTP error, deriving the retryable flag from the status class.
    #[must_use]
    pub const fn http(status: u16) -> Self {
        Self::Http {
            status,
            retryable: status >= 500 || status == 429,
        }
    }

    /// Returns true when the failure is transient and may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_)
            | Self::Timeout {
                ..
            } => true,
            Self::Http {
                retryable, ..
            } => *retryable,
            Self::Validation(_)
            | Self::Auth
            | Self::CircuitOpen {
                ..
            }
            | Self::InvalidDestination(_)
            | Self::Internal(_) => false,
        }
    }

    /// Returns the stable classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout {
                ..
            } => ErrorKind::Timeout,
            Self::Http {
                ..
            } => ErrorKind::Http,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth => ErrorKind::Auth,
            Self::CircuitOpen {
                ..
            } => ErrorKind::CircuitOpen,
            Self::InvalidDestination(_) => ErrorKind::InvalidDestination,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status when the error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http {
                status, ..
            } => Some(*status),
            _ => None,
        }
    }
}
