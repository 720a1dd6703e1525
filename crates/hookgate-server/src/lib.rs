// crates/hookgate-server/src/lib.rs
// ============================================================================
// Module: Hookgate Server Library
// Description: HTTP surface and runtime assembly for the hookgate service.
// Purpose: Expose event ingress, chat relay, signed deploy webhooks, and status.
// Dependencies: axum, hookgate-config, hookgate-delivery, hookgate-failover, tokio
// ============================================================================

//! ## Overview
//! [`Runtime::from_config`] wires the delivery client, fan-out dispatcher,
//! signature verifier, failover coordinator, and metrics window from a
//! validated [`hookgate_config::HookgateConfig`]. [`Runtime::serve`] runs the
//! axum router until the shutdown future resolves, then stops the health
//! monitor.
//! Invariants:
//! - Deployment handlers run only after signature verification succeeds.
//! - Inbound authentication failures return one generic response.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod deploy;
pub mod error;
pub mod routes;
pub mod runtime;
mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deploy::AcknowledgeDeployments;
pub use deploy::DeploymentHandler;
pub use deploy::DeploymentNotice;
pub use error::ServerError;
pub use routes::router;
pub use runtime::Runtime;
pub use runtime::SecretLookup;
pub use runtime::run;
pub use state::AppState;
