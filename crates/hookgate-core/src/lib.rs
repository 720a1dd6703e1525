// crates/hookgate-core/src/lib.rs
// ============================================================================
// Module: Hookgate Core Library
// Description: Public API surface for the Hookgate webhook core.
// Purpose: Expose domain types, interfaces, and resilience state machines.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Hookgate core holds the transport-agnostic pieces of the webhook delivery
//! and resilience core: destinations and domain events, the error taxonomy,
//! HMAC signature verification, per-destination circuit breakers, the rolling
//! delivery metrics window, and structured audit sinks.
//! Invariants:
//! - Circuit breaker state is mutated only through [`CircuitRegistry`].
//! - Signature verification fails closed and compares in constant time.
//! - Metrics never feed back into delivery decisions.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AttemptRecorder;
pub use interfaces::AuditSink;
pub use interfaces::HttpMethod;
pub use interfaces::HttpRequest;
pub use interfaces::HttpResponse;
pub use interfaces::HttpTransport;
pub use interfaces::NoopRecorder;
pub use interfaces::TransportError;
pub use runtime::Admission;
pub use runtime::AuditEvent;
pub use runtime::BreakdownStats;
pub use runtime::CircuitBreaker;
pub use runtime::CircuitConfig;
pub use runtime::CircuitRegistry;
pub use runtime::CircuitSnapshot;
pub use runtime::CircuitState;
pub use runtime::CircuitTransition;
pub use runtime::DeliveryMetrics;
pub use runtime::FileAuditSink;
pub use runtime::LatencySummary;
pub use runtime::MemoryAuditSink;
pub use runtime::MetricsConfig;
pub use runtime::MetricsSnapshot;
pub use runtime::NoopAuditSink;
pub use runtime::SIGNATURE_HEADER;
pub use runtime::SIGNATURE_PREFIX;
pub use runtime::SecretSlot;
pub use runtime::SignatureVerifier;
pub use runtime::SigningSecret;
pub use runtime::StderrAuditSink;
pub use runtime::SwitchReason;
pub use runtime::constant_time_eq;
pub use runtime::sign;
pub use runtime::verify;
