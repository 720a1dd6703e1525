// crates/hookgate-core/src/core/attempt.rs
// ============================================================================
// Module: Hookgate Delivery Attempts
// Description: Per-attempt delivery records.
// Purpose: Feed the rolling metrics window and the recent-error list.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! One [`DeliveryAttempt`] is produced for every network attempt the delivery
//! client makes, including attempts cut short by the overall deadline.
//! Circuit-open rejections never produce a record because no request left
//! the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::error::ErrorKind;
use crate::core::error::WebhookError;
use crate::core::identifiers::DestinationId;
use crate::core::identifiers::EventType;

// ============================================================================
// SECTION: Delivery Attempt
// ============================================================================

/// Outcome of a single network attempt.
///
/// # Invariants
/// - `attempt` is 1-based within one send.
/// - `error_kind` is `None` exactly when the attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAttempt {
    /// Wall-clock time the attempt finished, in Unix milliseconds.
    pub timestamp_ms: u64,
    /// Destination the attempt targeted.
    pub destination_id: DestinationId,
    /// Event type being delivered, when the send carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    /// 1-based attempt number.
    pub attempt: u32,
    /// HTTP status, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Error classification for failed attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error detail for failed attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Attempt latency in milliseconds.
    pub latency_ms: u64,
    /// Whether the failure was eligible for retry.
    pub retryable: bool,
}

impl DeliveryAttempt {
    /// Builds a record for a successful attempt.
    #[must_use]
    pub const fn success(
        timestamp_ms: u64,
        destination_id: DestinationId,
        event_type: Option<EventType>,
        attempt: u32,
        status: u16,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp_ms,
            destination_id,
            event_type,
            attempt,
            status: Some(status),
            error_kind: None,
            error_message: None,
            latency_ms,
            retryable: false,
        }
    }

    /// Builds a record for a failed attempt.
    #[must_use]
    pub fn failure(
        timestamp_ms: u64,
        destination_id: DestinationId,
        event_type: Option<EventType>,
        attempt: u32,
        error: &WebhookError,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp_ms,
            destination_id,
            event_type,
            attempt,
            status: error.status(),
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
            latency_ms,
            retryable: error.is_retryable(),
        }
    }

    /// Returns true when the attempt succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}
