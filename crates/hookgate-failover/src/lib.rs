// crates/hookgate-failover/src/lib.rs
// ============================================================================
// Module: Hookgate Failover Library
// Description: Health-driven selection of the active webhook receiver.
// Purpose: Keep exactly one redundant receiver active based on observed health.
// Dependencies: hookgate-core, hookgate-delivery, tokio
// ============================================================================

//! ## Overview
//! Each receiver runs a `healthy -> degraded -> unhealthy` state machine fed
//! by periodic probes. The [`FailoverCoordinator`] owns all receiver state
//! behind one lock and switches the active target when it becomes unhealthy.
//! The [`HealthMonitor`] schedules probes on its own task and delivers
//! results to the coordinator through a channel.
//! Invariants:
//! - Exactly one receiver is active at any instant.
//! - An unreachable cluster keeps the last-known active target.
//! - Probing never blocks request-path reads of the active target.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod coordinator;
pub mod health;
pub mod monitor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use coordinator::FailbackPolicy;
pub use coordinator::FailoverCoordinator;
pub use coordinator::FailoverError;
pub use coordinator::FailoverStatus;
pub use coordinator::Receiver;
pub use coordinator::ReceiverRole;
pub use coordinator::ReceiverStatus;
pub use health::HealthReport;
pub use health::HealthState;
pub use health::HealthThresholds;
pub use health::ProbeResult;
pub use health::ReceiverHealth;
pub use monitor::DeliveryProbe;
pub use monitor::HealthMonitor;
pub use monitor::HealthProbe;
pub use monitor::MonitorHandle;
pub use monitor::probe_round;
