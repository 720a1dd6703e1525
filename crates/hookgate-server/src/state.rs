// crates/hookgate-server/src/state.rs
// ============================================================================
// Module: Server State
// Description: Shared handles used by every HTTP handler.
// Dependencies: hookgate-core, hookgate-delivery, hookgate-failover
// ============================================================================

//! ## Overview
//! [`AppState`] is built once by the runtime and shared behind an `Arc`.

use std::sync::Arc;

use hookgate_core::AuditSink;
use hookgate_core::CircuitRegistry;
use hookgate_core::DeliveryMetrics;
use hookgate_core::SignatureVerifier;
use hookgate_delivery::AutomationClient;
use hookgate_delivery::FanoutDispatcher;
use hookgate_failover::FailoverCoordinator;

use crate::deploy::DeploymentHandler;
use crate::runtime::SecretLookup;

/// Shared server state for HTTP handlers.
pub struct AppState {
    /// Event fan-out.
    pub(crate) dispatcher: FanoutDispatcher,
    /// Chat relay, when an automation backend is configured.
    pub(crate) automation: Option<AutomationClient>,
    /// Inbound webhook verifier.
    pub(crate) verifier: SignatureVerifier,
    /// Deployment business handler.
    pub(crate) deployments: Arc<dyn DeploymentHandler>,
    /// Receiver failover, when configured.
    pub(crate) failover: Option<Arc<FailoverCoordinator>>,
    /// Delivery metrics window.
    pub(crate) metrics: Arc<DeliveryMetrics>,
    /// Per-destination circuits.
    pub(crate) circuits: Arc<CircuitRegistry>,
    /// Audit sink.
    pub(crate) audit: Arc<dyn AuditSink>,
    /// Bearer token for admin endpoints; `None` leaves them open.
    pub(crate) admin_token: Option<String>,
    /// Resolves credentials for replaced destinations.
    pub(crate) secrets: SecretLookup,
    /// Maximum inbound body size in bytes.
    pub(crate) max_body_bytes: usize,
}
