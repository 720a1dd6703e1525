// crates/hookgate-failover/src/health.rs
// ============================================================================
// Module: Receiver Health
// Description: Per-receiver health state machine driven by probe results.
// Purpose: Turn a stream of probe outcomes into a damped health verdict.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`ReceiverHealth::observe`] applies one probe result.
//! Invariants:
//! - `healthy -> degraded` on the first failure.
//! - `-> unhealthy` once consecutive failures reach the failure threshold.
//! - Recovery needs `recovery_threshold` consecutive successes per step:
//!   `unhealthy -> degraded`, then `degraded -> healthy`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Receiver health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Probes are passing.
    Healthy,
    /// Recent probe failures, below the unhealthy threshold.
    Degraded,
    /// Consecutive failures reached the threshold.
    Unhealthy,
}

/// Transition thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Consecutive failures that mark a receiver unhealthy.
    pub failure_threshold: u32,
    /// Consecutive successes required for each recovery step.
    pub recovery_threshold: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_threshold: 2,
        }
    }
}

/// Health document returned by a receiver's health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status label.
    pub status: String,
    /// Per-dependency status.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Value>,
}

impl HealthReport {
    /// Returns true when the receiver reports itself down.
    #[must_use]
    pub fn reports_down(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case("unhealthy") || status.eq_ignore_ascii_case("down")
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    /// Whether the probe passed.
    pub ok: bool,
    /// HTTP status, when a response arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Probe latency in milliseconds.
    pub latency_ms: u64,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Parsed health document, when the body carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<HealthReport>,
}

impl ProbeResult {
    /// Passing probe with no report.
    #[must_use]
    pub const fn passed(status: u16, latency_ms: u64) -> Self {
        Self {
            ok: true,
            status: Some(status),
            latency_ms,
            error: None,
            report: None,
        }
    }

    /// Failing probe.
    #[must_use]
    pub fn failed(status: Option<u16>, latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            latency_ms,
            error: Some(error.into()),
            report: None,
        }
    }
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Health bookkeeping for one receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverHealth {
    /// Current verdict.
    state: HealthState,
    /// Consecutive failed probes.
    consecutive_failures: u32,
    /// Consecutive passed probes since the last state change.
    consecutive_successes: u32,
    /// Wall-clock time of the last probe (Unix ms).
    last_probe_ms: Option<u64>,
    /// Last probe result.
    last_result: Option<ProbeResult>,
}

impl Default for ReceiverHealth {
    fn default() -> Self {
        Self {
            state: HealthState::Healthy,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_probe_ms: None,
            last_result: None,
        }
    }
}

impl ReceiverHealth {
    /// Returns the current verdict.
    #[must_use]
    pub const fn state(&self) -> HealthState {
        self.state
    }

    /// Returns consecutive failed probes.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns consecutive passed probes since the last state change.
    #[must_use]
    pub const fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Returns the last probe time (Unix ms).
    #[must_use]
    pub const fn last_probe_ms(&self) -> Option<u64> {
        self.last_probe_ms
    }

    /// Returns the last probe result.
    #[must_use]
    pub const fn last_result(&self) -> Option<&ProbeResult> {
        self.last_result.as_ref()
    }

    /// Applies a probe result observed at `at_ms`; returns the new state when it changed.
    pub fn observe(
        &mut self,
        result: ProbeResult,
        thresholds: HealthThresholds,
        at_ms: u64,
    ) -> Option<HealthState> {
        let previous = self.state;
        if result.ok {
            self.consecutive_failures = 0;
            self.consecutive_successes = self.consecutive_successes.saturating_add(1);
            let recovered = self.consecutive_successes >= thresholds.recovery_threshold;
            match self.state {
                HealthState::Unhealthy if recovered => self.step(HealthState::Degraded),
                HealthState::Degraded if recovered => self.step(HealthState::Healthy),
                HealthState::Healthy | HealthState::Degraded | HealthState::Unhealthy => {}
            }
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures >= thresholds.failure_threshold {
                self.state = HealthState::Unhealthy;
            } else if self.state == HealthState::Healthy {
                self.state = HealthState::Degraded;
            }
        }
        self.last_probe_ms = Some(at_ms);
        self.last_result = Some(result);
        (self.state != previous).then_some(self.state)
    }

    /// Moves to a recovery state and restarts the success count.
    const fn step(&mut self, next: HealthState) {
        self.state = next;
        self.consecutive_successes = 0;
    }
}
