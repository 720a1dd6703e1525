// crates/hookgate-delivery/src/lib.rs
// ============================================================================
// Module: Hookgate Delivery Library
// Description: Outbound webhook delivery, sink formatting, and fan-out.
// Purpose: Send events to external sinks reliably without blocking callers.
// Dependencies: hookgate-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! The [`DeliveryClient`] sends one request to one destination with
//! per-attempt and overall deadlines, bounded retries, and circuit-breaker
//! gating. The [`FanoutDispatcher`] shapes a domain event for every matching
//! destination and delivers to all of them concurrently. The
//! [`AutomationClient`] relays chat messages to the automation backend.
//! Invariants:
//! - A send makes at most `retry.max_attempts` network attempts.
//! - A circuit-open rejection makes no network call and records no attempt.
//! - One destination's failure never prevents delivery to the others.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod automation;
pub mod client;
pub mod fanout;
pub mod format;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::auth_headers;
pub use automation::AutomationClient;
pub use automation::CHAT_MESSAGE_EVENT;
pub use automation::AutomationReply;
pub use automation::ChatMessage;
pub use client::DeliveryClient;
pub use client::HEALTH_PROBE_EVENT;
pub use client::DeliveryConfig;
pub use client::OutboundRequest;
pub use client::ResponseBody;
pub use client::ResponseSchema;
pub use fanout::DestinationSet;
pub use fanout::DispatchOutcome;
pub use fanout::DispatchReport;
pub use fanout::FanoutDispatcher;
pub use fanout::OutcomeSummary;
pub use format::format_event;
pub use transport::DEFAULT_MAX_RESPONSE_BYTES;
pub use transport::ReqwestTransport;
