// crates/hookgate-core/src/runtime/audit.rs
// ============================================================================
// Module: Hookgate Audit Events
// Description: Structured audit events and JSON-line sinks.
// Purpose: Record resilience transitions and security rejections without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events capture state changes operators care about: circuit
//! transitions, failover switches and alerts, rejected signatures, accepted
//! deployments, and destination replacements. Sinks serialize each event as
//! one JSON line. Events never carry secrets or payload bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ErrorKind;
use crate::core::identifiers::DestinationId;
use crate::core::identifiers::EventType;
use crate::core::identifiers::ReceiverId;
use crate::interfaces::AuditSink;
use crate::runtime::circuit::CircuitState;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Why the failover coordinator changed the active receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchReason {
    /// The active receiver became unhealthy.
    Unhealthy,
    /// The primary recovered and traffic returned to it.
    Failback,
    /// An operator forced the switch.
    Manual,
}

/// Audit event payload.
///
/// # Invariants
/// - Serialized with an `event` tag; tag names are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A destination circuit changed state.
    CircuitTransition {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Destination whose circuit changed.
        destination_id: DestinationId,
        /// Previous state.
        from: CircuitState,
        /// New state.
        to: CircuitState,
        /// Consecutive failures at the time of the change.
        consecutive_failures: u32,
    },
    /// The active receiver changed.
    FailoverSwitch {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Previously active receiver.
        from: ReceiverId,
        /// Newly active receiver.
        to: ReceiverId,
        /// Switch cause.
        reason: SwitchReason,
    },
    /// The active receiver is unhealthy and no alternative is available.
    FailoverAlert {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Receiver that remains active.
        active: ReceiverId,
        /// Operator-facing message.
        message: String,
    },
    /// The primary recovered while failback is manual.
    FailbackPending {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Recovered primary receiver.
        primary: ReceiverId,
    },
    /// A destination exhausted its attempts during fan-out.
    DeliveryFailed {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Destination that failed.
        destination_id: DestinationId,
        /// Event type being delivered.
        event_type: EventType,
        /// Final error classification.
        error_kind: ErrorKind,
    },
    /// An inbound request failed signature verification.
    SignatureRejected {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Request path.
        path: String,
    },
    /// A signed deployment notification was accepted.
    DeploymentAccepted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Repository name when present in the payload.
        repository: Option<String>,
        /// Git ref when present in the payload.
        git_ref: Option<String>,
    },
    /// The destination set was replaced.
    DestinationsReplaced {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u64,
        /// Number of destinations in the new set.
        count: usize,
    },
}

impl AuditEvent {
    /// Returns the stable event tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CircuitTransition {
                ..
            } => "circuit_transition",
            Self::FailoverSwitch {
                ..
            } => "failover_switch",
            Self::FailoverAlert {
                ..
            } => "failover_alert",
            Self::FailbackPending {
                ..
            } => "failback_pending",
            Self::DeliveryFailed {
                ..
            } => "delivery_failed",
            Self::SignatureRejected {
                ..
            } => "signature_rejected",
            Self::DeploymentAccepted {
                ..
            } => "deployment_accepted",
            Self::DestinationsReplaced {
                ..
            } => "destinations_replaced",
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
#[derive(Debug)]
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the tags of the recorded events.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().map(AuditEvent::name).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }
}
