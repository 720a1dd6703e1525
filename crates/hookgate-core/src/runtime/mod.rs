// crates/hookgate-core/src/runtime/mod.rs
// ============================================================================
// Module: Hookgate Runtime
// Description: Resilience state machines, signature checks, metrics, and audit sinks.
// Purpose: Provide the in-process building blocks used by delivery and failover.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components own shared mutable state behind narrow interfaces:
//! circuit breakers per destination, the rotatable signing secret, and the
//! rolling attempt window. Each can be constructed in isolation for tests.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod circuit;
pub mod metrics;
pub mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::SwitchReason;
pub use circuit::Admission;
pub use circuit::CircuitBreaker;
pub use circuit::CircuitConfig;
pub use circuit::CircuitRegistry;
pub use circuit::CircuitSnapshot;
pub use circuit::CircuitState;
pub use circuit::CircuitTransition;
pub use metrics::BreakdownStats;
pub use metrics::DeliveryMetrics;
pub use metrics::LatencySummary;
pub use metrics::MetricsConfig;
pub use metrics::MetricsSnapshot;
pub use signature::SIGNATURE_HEADER;
pub use signature::SIGNATURE_PREFIX;
pub use signature::SecretSlot;
pub use signature::SignatureVerifier;
pub use signature::SigningSecret;
pub use signature::constant_time_eq;
pub use signature::sign;
pub use signature::verify;
