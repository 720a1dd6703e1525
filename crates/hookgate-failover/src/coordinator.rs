// crates/hookgate-failover/src/coordinator.rs
// ============================================================================
// Module: Failover Coordinator
// Description: Active receiver selection over per-receiver health state.
// Purpose: Switch traffic away from unhealthy receivers and back on recovery.
// Dependencies: hookgate-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The coordinator holds every receiver's [`ReceiverHealth`] and the active
//! index behind a single lock. Each probe result is applied and the switch
//! decision evaluated under that lock, so readers always see one consistent
//! active receiver. Audit events are emitted after the lock is released.
//! Invariants:
//! - The first configured receiver is the primary.
//! - A switch prefers the first healthy alternative, then the first degraded
//!   one; with neither, the active receiver is kept and one alert is raised.
//! - Automatic failback only reverses a health-driven switch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use hookgate_core::AuditEvent;
use hookgate_core::AuditSink;
use hookgate_core::ReceiverId;
use hookgate_core::SwitchReason;
use hookgate_core::now_ms;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::health::HealthReport;
use crate::health::HealthState;
use crate::health::HealthThresholds;
use crate::health::ProbeResult;
use crate::health::ReceiverHealth;

/// Index of the primary receiver.
const PRIMARY: usize = 0;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How traffic returns to a recovered primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailbackPolicy {
    /// Switch back as soon as the primary is healthy again.
    #[default]
    Automatic,
    /// Flag the recovery and wait for an operator.
    Manual,
}

/// One redundant receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    /// Receiver identifier.
    pub id: ReceiverId,
    /// Webhook URL traffic is sent to while active.
    pub url: String,
    /// Health endpoint probed by the monitor.
    pub health_url: String,
}

/// Receiver role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverRole {
    /// First configured receiver.
    Primary,
    /// Any later receiver.
    Backup,
}

/// Failover coordinator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    /// Receiver list is unusable.
    #[error("invalid failover configuration: {0}")]
    Invalid(String),
    /// Receiver id is not configured.
    #[error("unknown receiver: {0}")]
    UnknownReceiver(ReceiverId),
}

/// Status of one receiver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiverStatus {
    /// Receiver identifier.
    pub id: ReceiverId,
    /// Receiver role.
    pub role: ReceiverRole,
    /// Webhook URL.
    pub url: String,
    /// Whether this receiver is active.
    pub active: bool,
    /// Health verdict.
    pub state: HealthState,
    /// Consecutive failed probes.
    pub consecutive_failures: u32,
    /// Consecutive passed probes since the last state change.
    pub consecutive_successes: u32,
    /// Last probe time (Unix ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe_ms: Option<u64>,
    /// Last probe latency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_latency_ms: Option<u64>,
    /// Last probe failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Last health document reported by the receiver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<HealthReport>,
}

/// Coordinator status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailoverStatus {
    /// Active receiver.
    pub active: ReceiverId,
    /// Failback policy.
    pub failback: FailbackPolicy,
    /// Primary is healthy and awaits a manual failback.
    pub failback_pending: bool,
    /// Last switch time (Unix ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_switch_ms: Option<u64>,
    /// Last switch cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_switch_reason: Option<SwitchReason>,
    /// Per-receiver status, primary first.
    pub receivers: Vec<ReceiverStatus>,
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Receiver with its health bookkeeping.
#[derive(Debug)]
struct ReceiverEntry {
    /// Receiver definition.
    receiver: Receiver,
    /// Health state machine.
    health: ReceiverHealth,
}

/// Mutable coordinator state.
#[derive(Debug)]
struct FailoverState {
    /// Receivers, primary first.
    receivers: Vec<ReceiverEntry>,
    /// Index of the active receiver.
    active: usize,
    /// Last switch time (Unix ms).
    last_switch_ms: Option<u64>,
    /// Last switch cause.
    last_switch_reason: Option<SwitchReason>,
    /// Manual failback flag.
    failback_pending: bool,
    /// An alert was raised for the current unhealthy episode.
    alert_raised: bool,
}

impl FailoverState {
    /// Returns the receiver index for `id`.
    fn index_of(&self, id: &ReceiverId) -> Option<usize> {
        self.receivers.iter().position(|entry| &entry.receiver.id == id)
    }

    /// First healthy alternative, else first degraded alternative.
    fn best_alternative(&self) -> Option<usize> {
        let candidate = |wanted: HealthState| {
            self.receivers
                .iter()
                .enumerate()
                .find(|(index, entry)| *index != self.active && entry.health.state() == wanted)
                .map(|(index, _)| index)
        };
        candidate(HealthState::Healthy).or_else(|| candidate(HealthState::Degraded))
    }

    /// Moves the active designation and returns the audit event.
    fn switch_to(&mut self, target: usize, reason: SwitchReason, at_ms: u64) -> AuditEvent {
        let from = self.receivers[self.active].receiver.id.clone();
        self.active = target;
        self.last_switch_ms = Some(at_ms);
        self.last_switch_reason = Some(reason);
        self.alert_raised = false;
        if target == PRIMARY {
            self.failback_pending = false;
        }
        AuditEvent::FailoverSwitch {
            timestamp_ms: at_ms,
            from,
            to: self.receivers[target].receiver.id.clone(),
            reason,
        }
    }
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Chooses the active receiver from probe results.
pub struct FailoverCoordinator {
    /// Receiver state and active designation.
    state: RwLock<FailoverState>,
    /// Health transition thresholds.
    thresholds: HealthThresholds,
    /// Failback policy.
    failback: FailbackPolicy,
    /// Sink for switch, alert, and failback events.
    audit: Arc<dyn AuditSink>,
}

impl FailoverCoordinator {
    /// Creates a coordinator; the first receiver is the primary and starts active.
    ///
    /// # Errors
    ///
    /// Returns [`FailoverError::Invalid`] when the list is empty, ids repeat,
    /// or a URL is blank.
    pub fn new(
        receivers: Vec<Receiver>,
        thresholds: HealthThresholds,
        failback: FailbackPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, FailoverError> {
        if receivers.is_empty() {
            return Err(FailoverError::Invalid("at least one receiver is required".to_string()));
        }
        if thresholds.failure_threshold == 0 || thresholds.recovery_threshold == 0 {
            return Err(FailoverError::Invalid("thresholds must be at least 1".to_string()));
        }
        let mut seen = HashSet::with_capacity(receivers.len());
        for receiver in &receivers {
            if !seen.insert(&receiver.id) {
                return Err(FailoverError::Invalid(format!("duplicate receiver {}", receiver.id)));
            }
            if receiver.url.trim().is_empty() || receiver.health_url.trim().is_empty() {
                return Err(FailoverError::Invalid(format!(
                    "receiver {} requires url and health_url",
                    receiver.id
                )));
            }
        }
        let receivers = receivers
            .into_iter()
            .map(|receiver| ReceiverEntry {
                receiver,
                health: ReceiverHealth::default(),
            })
            .collect();
        Ok(Self {
            state: RwLock::new(FailoverState {
                receivers,
                active: PRIMARY,
                last_switch_ms: None,
                last_switch_reason: None,
                failback_pending: false,
                alert_raised: false,
            }),
            thresholds,
            failback,
            audit,
        })
    }

    /// Returns the failback policy.
    #[must_use]
    pub const fn failback(&self) -> FailbackPolicy {
        self.failback
    }

    /// Returns the configured receivers, primary first.
    #[must_use]
    pub fn receivers(&self) -> Vec<Receiver> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.receivers.iter().map(|entry| entry.receiver.clone()).collect()
    }

    /// Returns the active receiver id.
    #[must_use]
    pub fn active_target(&self) -> ReceiverId {
        self.active_receiver().id
    }

    /// Returns the active receiver.
    #[must_use]
    pub fn active_receiver(&self) -> Receiver {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.receivers[state.active].receiver.clone()
    }

    /// Applies one probe result and re-evaluates the active receiver.
    ///
    /// # Errors
    ///
    /// Returns [`FailoverError::UnknownReceiver`] for an unconfigured id.
    pub fn apply_probe(&self, id: &ReceiverId, result: ProbeResult) -> Result<(), FailoverError> {
        let events = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let index =
                state.index_of(id).ok_or_else(|| FailoverError::UnknownReceiver(id.clone()))?;
            let at_ms = now_ms();
            state.receivers[index].health.observe(result, self.thresholds, at_ms);
            self.evaluate(&mut state, at_ms)
        };
        for event in &events {
            self.audit.record(event);
        }
        Ok(())
    }

    /// Forces `target` active regardless of health.
    ///
    /// # Errors
    ///
    /// Returns [`FailoverError::UnknownReceiver`] for an unconfigured id.
    pub fn trigger_failover(&self, target: &ReceiverId) -> Result<FailoverStatus, FailoverError> {
        let event = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let index = state
                .index_of(target)
                .ok_or_else(|| FailoverError::UnknownReceiver(target.clone()))?;
            (index != state.active).then(|| state.switch_to(index, SwitchReason::Manual, now_ms()))
        };
        if let Some(event) = &event {
            self.audit.record(event);
        }
        Ok(self.status())
    }

    /// Returns a consistent status snapshot.
    #[must_use]
    pub fn status(&self) -> FailoverStatus {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let receivers = state
            .receivers
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let last = entry.health.last_result();
                ReceiverStatus {
                    id: entry.receiver.id.clone(),
                    role: if index == PRIMARY {
                        ReceiverRole::Primary
                    } else {
                        ReceiverRole::Backup
                    },
                    url: entry.receiver.url.clone(),
                    active: index == state.active,
                    state: entry.health.state(),
                    consecutive_failures: entry.health.consecutive_failures(),
                    consecutive_successes: entry.health.consecutive_successes(),
                    last_probe_ms: entry.health.last_probe_ms(),
                    last_latency_ms: last.map(|result| result.latency_ms),
                    last_error: last.and_then(|result| result.error.clone()),
                    report: last.and_then(|result| result.report.clone()),
                }
            })
            .collect();
        FailoverStatus {
            active: state.receivers[state.active].receiver.id.clone(),
            failback: self.failback,
            failback_pending: state.failback_pending,
            last_switch_ms: state.last_switch_ms,
            last_switch_reason: state.last_switch_reason,
            receivers,
        }
    }

    /// Runs the switch and failback rules; returns audit events to emit.
    fn evaluate(&self, state: &mut FailoverState, at_ms: u64) -> Vec<AuditEvent> {
        let mut events = Vec::new();
        if state.receivers[state.active].health.state() == HealthState::Unhealthy {
            if let Some(target) = state.best_alternative() {
                events.push(state.switch_to(target, SwitchReason::Unhealthy, at_ms));
            } else if !state.alert_raised {
                state.alert_raised = true;
                let active = state.receivers[state.active].receiver.id.clone();
                events.push(AuditEvent::FailoverAlert {
                    timestamp_ms: at_ms,
                    message: format!(
                        "receiver {active} is unhealthy and no alternative is available"
                    ),
                    active,
                });
            }
        } else {
            state.alert_raised = false;
        }

        let primary_healthy = state.receivers[PRIMARY].health.state() == HealthState::Healthy;
        if !primary_healthy {
            state.failback_pending = false;
            return events;
        }
        let health_driven = state.last_switch_reason == Some(SwitchReason::Unhealthy);
        if state.active == PRIMARY || !health_driven {
            return events;
        }
        match self.failback {
            FailbackPolicy::Automatic => {
                events.push(state.switch_to(PRIMARY, SwitchReason::Failback, at_ms));
            }
            FailbackPolicy::Manual if !state.failback_pending => {
                state.failback_pending = true;
                events.push(AuditEvent::FailbackPending {
                    timestamp_ms: at_ms,
                    primary: state.receivers[PRIMARY].receiver.id.clone(),
                });
            }
            FailbackPolicy::Manual => {}
        }
        events
    }
}
