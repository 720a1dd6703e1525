// crates/hookgate-core/src/core/event.rs
// ============================================================================
// Module: Hookgate Domain Events
// Description: Chat and bug events fanned out to external sinks.
// Purpose: Carry the attributes sink formatters and filters need.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`DomainEvent`] is produced by the surrounding product (chat messages,
//! bug lifecycle changes) and handed to the fan-out dispatcher. The subject
//! carries the fields destination filters match on; `data` carries opaque
//! extras in key order so serialization is deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventType;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity of a bug or incident event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic or low-impact issue.
    Low,
    /// Degraded behavior with a workaround.
    Medium,
    /// Major feature broken.
    High,
    /// Outage or data loss.
    Critical,
}

impl Severity {
    /// Returns the lowercase wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Returns the capitalized display label used in chat attachments.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

// ============================================================================
// SECTION: Domain Event
// ============================================================================

/// Descriptive attributes of the thing an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubject {
    /// Short human-readable title.
    pub title: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Workflow status (for example `open`, `resolved`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Severity, when the event describes a bug or incident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Free-form category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Assignee handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Additional labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EventSubject {
    /// Creates a subject with only a title set.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: None,
            severity: None,
            category: None,
            assignee: None,
            tags: Vec::new(),
        }
    }
}

/// Event emitted by the product and delivered to subscribed destinations.
///
/// # Invariants
/// - `occurred_at` is the only timestamp formatters may embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event type name.
    pub event_type: EventType,
    /// Producer-assigned event identifier.
    pub event_id: String,
    /// Producer timestamp (RFC 3339), when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<String>,
    /// Subject attributes used for filtering and formatting.
    pub subject: EventSubject,
    /// Opaque extra data forwarded to generic sinks.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl DomainEvent {
    /// Creates an event with an empty data map and no timestamp.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        event_id: impl Into<String>,
        subject: EventSubject,
    ) -> Self {
        Self {
            event_type: EventType::new(event_type),
            event_id: event_id.into(),
            occurred_at: None,
            subject,
            data: BTreeMap::new(),
        }
    }
}
