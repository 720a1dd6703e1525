// crates/hookgate-server/src/deploy.rs
// ============================================================================
// Module: Deployment Webhooks
// Description: Verified deployment notifications and their business handler.
// Purpose: Hand authenticated deploy triggers to the deployment system.
// Dependencies: async-trait, serde_json, hookgate-core
// ============================================================================

//! ## Overview
//! The route verifies the signature over the raw body first; only then is the
//! body parsed into a [`DeploymentNotice`] and passed to the configured
//! [`DeploymentHandler`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use hookgate_core::WebhookError;
use serde_json::Value;

// ============================================================================
// SECTION: Notice
// ============================================================================

/// Authenticated deployment notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentNotice {
    /// Repository name (`repository.full_name`, `repository.name`, or a string `repository`).
    pub repository: Option<String>,
    /// Git ref (`ref`).
    pub git_ref: Option<String>,
    /// Full JSON payload.
    pub payload: Value,
}

impl DeploymentNotice {
    /// Parses a verified request body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Validation`] unless the body is a JSON object.
    pub fn from_payload(body: &[u8]) -> Result<Self, WebhookError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|err| WebhookError::Validation(format!("invalid deployment payload: {err}")))?;
        if !payload.is_object() {
            return Err(WebhookError::Validation(
                "deployment payload must be a json object".to_string(),
            ));
        }
        let repository = payload
            .pointer("/repository/full_name")
            .or_else(|| payload.pointer("/repository/name"))
            .or_else(|| payload.get("repository"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let git_ref = payload.get("ref").and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            repository,
            git_ref,
            payload,
        })
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Business handler for verified deployment triggers.
#[async_trait]
pub trait DeploymentHandler: Send + Sync {
    /// Acts on one verified notification.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] when the deployment cannot be started.
    async fn handle(&self, notice: DeploymentNotice) -> Result<(), WebhookError>;
}

/// Handler that accepts every verified notification without further action.
pub struct AcknowledgeDeployments;

#[async_trait]
impl DeploymentHandler for AcknowledgeDeployments {
    async fn handle(&self, _notice: DeploymentNotice) -> Result<(), WebhookError> {
        Ok(())
    }
}
