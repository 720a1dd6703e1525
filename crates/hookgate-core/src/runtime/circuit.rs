// crates/hookgate-core/src/runtime/circuit.rs
// ============================================================================
// Module: Hookgate Circuit Breakers
// Description: Per-destination circuit breaker state machine and registry.
// Purpose: Fail fast against destinations that keep failing until a cooldown passes.
// Dependencies: serde, crate::interfaces
// ============================================================================

//! ## Overview
//! Each destination owns one [`CircuitBreaker`]. The [`CircuitRegistry`]
//! serializes every read-modify-write of a breaker behind one narrow lock so
//! concurrent sends cannot lose failure increments.
//! Invariants:
//! - `closed -> open` only after `failure_threshold` consecutive terminal failures.
//! - `open -> half_open` only once the cooldown has elapsed.
//! - `half_open -> closed` after one success; `half_open -> open` after one failure.
//! - A success observed while `open` resets the counter but does not close the circuit.
//!
//! Time is supplied by callers as monotonic [`Instant`] values so tests can
//! drive the state machine deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::WebhookError;
use crate::core::identifiers::DestinationId;
use crate::core::time::now_ms;
use crate::interfaces::AuditSink;
use crate::runtime::audit::AuditEvent;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Breaker thresholds shared by every destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitConfig {
    /// Consecutive terminal failures that open the circuit.
    pub failure_threshold: u32,
    /// Time the circuit stays open before allowing a trial.
    pub cooldown: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests fail fast until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the next outcome decides the state.
    HalfOpen,
}

/// State change produced by a breaker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitTransition {
    /// Previous state.
    pub from: CircuitState,
    /// New state.
    pub to: CircuitState,
    /// Consecutive failures after the change.
    pub consecutive_failures: u32,
}

/// Admission decision for a prospective request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed.
    Allowed,
    /// The circuit is open.
    Rejected {
        /// Cooldown time left before a trial is allowed.
        remaining: Duration,
    },
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive terminal failures.
    pub consecutive_failures: u32,
    /// Cooldown remaining while open, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_remaining_ms: Option<u64>,
}

/// Circuit breaker for a single destination.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    /// Breaker thresholds.
    config: CircuitConfig,
    /// Current state.
    state: CircuitState,
    /// Consecutive terminal failures.
    consecutive_failures: u32,
    /// Instant the circuit last opened.
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub const fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    /// Returns the current state without applying cooldown expiry.
    #[must_use]
    pub const fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns the consecutive failure count.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns the cooldown remaining at `now`, if the circuit is open.
    #[must_use]
    pub fn open_remaining(&self, now: Instant) -> Option<Duration> {
        if self.state != CircuitState::Open {
            return None;
        }
        let opened_at = self.opened_at?;
        Some(self.config.cooldown.saturating_sub(now.saturating_duration_since(opened_at)))
    }

    /// Decides whether a request may proceed at `now`.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// admits the request.
    pub fn admit(&mut self, now: Instant) -> (Admission, Option<CircuitTransition>) {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => (Admission::Allowed, None),
            CircuitState::Open => {
                let remaining = self.open_remaining(now).unwrap_or_default();
                if remaining.is_zero() {
                    let transition = self.transition(CircuitState::HalfOpen);
                    (Admission::Allowed, transition)
                } else {
                    (
                        Admission::Rejected {
                            remaining,
                        },
                        None,
                    )
                }
            }
        }
    }

    /// Records a terminal success.
    pub fn record_success(&mut self) -> Option<CircuitTransition> {
        self.consecutive_failures = 0;
        match self.state {
            CircuitState::HalfOpen => {
                self.opened_at = None;
                self.transition(CircuitState::Closed)
            }
            CircuitState::Closed | CircuitState::Open => None,
        }
    }

    /// Records a terminal failure observed at `now`.
    pub fn record_failure(&mut self, now: Instant) -> Option<CircuitTransition> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        match self.state {
            CircuitState::Closed if self.consecutive_failures >= self.config.failure_threshold => {
                self.opened_at = Some(now);
                self.transition(CircuitState::Open)
            }
            CircuitState::HalfOpen => {
                self.opened_at = Some(now);
                self.transition(CircuitState::Open)
            }
            CircuitState::Closed | CircuitState::Open => None,
        }
    }

    /// Returns a snapshot at `now`.
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> CircuitSnapshot {
        CircuitSnapshot {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            open_remaining_ms: self.open_remaining(now).map(duration_ms),
        }
    }

    /// Moves to `to`, returning the transition when the state changed.
    fn transition(&mut self, to: CircuitState) -> Option<CircuitTransition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        Some(CircuitTransition {
            from,
            to,
            consecutive_failures: self.consecutive_failures,
        })
    }
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Owns the breakers for every destination.
///
/// # Invariants
/// - Each breaker is mutated only while the registry lock is held.
/// - Audit events are emitted after the lock is released.
pub struct CircuitRegistry {
    /// Thresholds applied to new breakers.
    config: CircuitConfig,
    /// Breakers keyed by destination.
    breakers: Mutex<HashMap<DestinationId, CircuitBreaker>>,
    /// Sink for transition events.
    audit: Arc<dyn AuditSink>,
}

impl CircuitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: CircuitConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
            audit,
        }
    }

    /// Returns the breaker thresholds.
    #[must_use]
    pub const fn config(&self) -> CircuitConfig {
        self.config
    }

    /// Admits or rejects a request to `id` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::CircuitOpen`] while the cooldown is running.
    pub fn admit(&self, id: &DestinationId, now: Instant) -> Result<(), WebhookError> {
        let (admission, transition) = self.with_breaker(id, |breaker| breaker.admit(now));
        self.emit(id, transition);
        match admission {
            Admission::Allowed => Ok(()),
            Admission::Rejected {
                ..
            } => Err(WebhookError::CircuitOpen {
                destination: id.clone(),
            }),
        }
    }

    /// Records a terminal success for `id`.
    pub fn record_success(&self, id: &DestinationId) {
        let transition = self.with_breaker(id, CircuitBreaker::record_success);
        self.emit(id, transition);
    }

    /// Records a terminal failure for `id` at `now`.
    pub fn record_failure(&self, id: &DestinationId, now: Instant) {
        let transition = self.with_breaker(id, |breaker| breaker.record_failure(now));
        self.emit(id, transition);
    }

    /// Returns the snapshot for `id`; unknown destinations report closed.
    #[must_use]
    pub fn snapshot(&self, id: &DestinationId, now: Instant) -> CircuitSnapshot {
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers.get(id).map_or_else(
            || CircuitBreaker::new(self.config).snapshot(now),
            |breaker| breaker.snapshot(now),
        )
    }

    /// Returns snapshots for every tracked destination in id order.
    #[must_use]
    pub fn snapshots(&self, now: Instant) -> BTreeMap<DestinationId, CircuitSnapshot> {
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers.iter().map(|(id, breaker)| (id.clone(), breaker.snapshot(now))).collect()
    }

    /// Drops breakers for destinations not in `keep`.
    pub fn retain(&self, keep: &[DestinationId]) {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers.retain(|id, _| keep.contains(id));
    }

    /// Runs `op` against the breaker for `id`, creating it when absent.
    fn with_breaker<T>(&self, id: &DestinationId, op: impl FnOnce(&mut CircuitBreaker) -> T) -> T {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let breaker =
            breakers.entry(id.clone()).or_insert_with(|| CircuitBreaker::new(self.config));
        op(breaker)
    }

    /// Emits an audit event for a state change.
    fn emit(&self, id: &DestinationId, transition: Option<CircuitTransition>) {
        if let Some(transition) = transition {
            self.audit.record(&AuditEvent::CircuitTransition {
                timestamp_ms: now_ms(),
                destination_id: id.clone(),
                from: transition.from,
                to: transition.to,
                consecutive_failures: transition.consecutive_failures,
            });
        }
    }
}
