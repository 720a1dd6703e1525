// crates/hookgate-delivery/src/automation.rs
// ============================================================================
// Module: Automation Backend Client
// Description: Chat message relay to the external automation backend.
// Purpose: Post chat messages and validate the backend's reply contract.
// Dependencies: serde, serde_json, hookgate-core
// ============================================================================

//! ## Overview
//! Chat messages are posted as camelCase JSON through the [`DeliveryClient`],
//! so they share retry, deadline, and circuit behavior with sink delivery.
//! A 2xx reply that is not `{ success, response? }` is a validation error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use hookgate_core::Destination;
use hookgate_core::EventType;
use hookgate_core::WebhookError;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::auth::auth_headers;
use crate::client::DeliveryClient;
use crate::client::OutboundRequest;
use crate::client::ResponseSchema;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event type recorded for chat relays.
pub const CHAT_MESSAGE_EVENT: &str = "message.sent";

/// Chat message forwarded to the automation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message text.
    pub message: String,
    /// Conversation session identifier.
    pub session_id: String,
    /// Originating surface (for example `web`).
    pub source: String,
    /// Chat identifier.
    pub chat_id: String,
    /// Client timestamp (RFC 3339).
    pub timestamp: String,
    /// Additional fields passed through unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Reply contract of the automation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationReply {
    /// Whether the backend handled the message.
    pub success: bool,
    /// Optional reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Relays chat messages to the automation backend destination.
pub struct AutomationClient {
    /// Shared delivery client.
    client: Arc<DeliveryClient>,
    /// Backend destination.
    destination: Destination,
}

impl AutomationClient {
    /// Creates a client for `destination`.
    #[must_use]
    pub const fn new(client: Arc<DeliveryClient>, destination: Destination) -> Self {
        Self {
            client,
            destination,
        }
    }

    /// Returns the backend destination.
    #[must_use]
    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Posts `message` and returns the backend reply.
    ///
    /// # Errors
    ///
    /// Returns the delivery error, or [`WebhookError::Validation`] when the
    /// reply does not match the contract.
    pub async fn send_chat(&self, message: &ChatMessage) -> Result<AutomationReply, WebhookError> {
        let body = serde_json::to_vec(message).map_err(|err| {
            WebhookError::Internal(format!("failed to encode chat message: {err}"))
        })?;
        let request = OutboundRequest::post_json(body)
            .with_headers(auth_headers(&self.destination.auth))
            .expecting(ResponseSchema::AutomationReply)
            .with_event_type(EventType::new(CHAT_MESSAGE_EVENT));
        let response = self.client.send(&self.destination, request).await?;
        response.json()
    }
}
