// crates/hookgate-delivery/src/format.rs
// ============================================================================
// Module: Sink Formatters
// Description: Per-shape wire payloads for generic, Sentry, Datadog, and Slack sinks.
// Purpose: Map one domain event into the body each sink expects.
// Dependencies: serde, serde_json, hookgate-core
// ============================================================================

//! ## Overview
//! Each [`SinkShape`] has one formatting function. Payload structs borrow
//! from the event and use ordered maps, so formatting is deterministic.
//! Invariants:
//! - Same event and shape produce byte-identical output.
//! - The only timestamp embedded is the event's own `occurred_at`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use hookgate_core::DomainEvent;
use hookgate_core::Severity;
use hookgate_core::SinkShape;
use hookgate_core::WebhookError;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Serializes `event` in the wire shape for `shape`.
///
/// # Errors
///
/// Returns [`WebhookError::Internal`] if serialization fails.
pub fn format_event(shape: SinkShape, event: &DomainEvent) -> Result<Vec<u8>, WebhookError> {
    let encoded = match shape {
        SinkShape::Generic => serde_json::to_vec(event),
        SinkShape::Sentry => serde_json::to_vec(&sentry_issue(event)),
        SinkShape::DataDog => serde_json::to_vec(&datadog_event(event)),
        SinkShape::Slack => serde_json::to_vec(&slack_message(event)),
    };
    encoded.map_err(|err| {
        WebhookError::Internal(format!("failed to format {} payload: {err}", shape.as_str()))
    })
}

// ============================================================================
// SECTION: Sentry
// ============================================================================

/// Sentry-style issue report.
#[derive(Serialize)]
struct SentryIssue<'a> {
    /// Issue title.
    title: &'a str,
    /// Issue message.
    message: &'a str,
    /// Sentry level.
    level: &'static str,
    /// Indexed tags.
    tags: BTreeMap<&'static str, &'a str>,
    /// Structured context.
    contexts: SentryContexts<'a>,
    /// Event timestamp, when the event carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
}

/// Sentry context block.
#[derive(Serialize)]
struct SentryContexts<'a> {
    /// Event-level context.
    event: SentryEventContext<'a>,
}

/// Event attributes not represented as tags.
#[derive(Serialize)]
struct SentryEventContext<'a> {
    /// Producer event identifier.
    event_id: &'a str,
    /// Event type name.
    event_type: &'a str,
    /// Free-form labels.
    labels: &'a [String],
    /// Opaque extra data.
    data: &'a BTreeMap<String, Value>,
}

/// Builds the Sentry payload.
fn sentry_issue(event: &DomainEvent) -> SentryIssue<'_> {
    let subject = &event.subject;
    let level = if event.event_type.is_bug_report() {
        "error"
    } else {
        sentry_level(subject.severity)
    };
    SentryIssue {
        title: &subject.title,
        message: subject.description.as_deref().unwrap_or(&subject.title),
        level,
        tags: attribute_tags(event),
        contexts: SentryContexts {
            event: SentryEventContext {
                event_id: &event.event_id,
                event_type: event.event_type.as_str(),
                labels: &subject.tags,
                data: &event.data,
            },
        },
        timestamp: event.occurred_at.as_deref(),
    }
}

/// Maps severity to a Sentry level for non-bug events.
const fn sentry_level(severity: Option<Severity>) -> &'static str {
    match severity {
        Some(Severity::Critical) => "fatal",
        Some(Severity::High) => "error",
        Some(Severity::Medium) => "warning",
        Some(Severity::Low) | None => "info",
    }
}

// ============================================================================
// SECTION: Datadog
// ============================================================================

/// Datadog-style monitoring event.
#[derive(Serialize)]
struct DataDogEvent<'a> {
    /// Event title.
    title: String,
    /// Event body text.
    text: &'a str,
    /// `normal` or `low`.
    priority: &'static str,
    /// `error` or `warning`.
    alert_type: &'static str,
    /// `key:value` tags.
    tags: Vec<String>,
    /// Groups related events.
    aggregation_key: &'a str,
}

/// Builds the Datadog payload.
fn datadog_event(event: &DomainEvent) -> DataDogEvent<'_> {
    let subject = &event.subject;
    let priority = match subject.severity {
        Some(Severity::High | Severity::Critical) => "normal",
        Some(Severity::Low | Severity::Medium) | None => "low",
    };
    let alert_type = match subject.severity {
        Some(Severity::Critical) => "error",
        _ => "warning",
    };
    let mut tags: Vec<String> =
        attribute_tags(event).into_iter().map(|(key, value)| format!("{key}:{value}")).collect();
    tags.extend(subject.tags.iter().cloned());
    DataDogEvent {
        title: format!("[{}] {}", event.event_type, subject.title),
        text: subject.description.as_deref().unwrap_or(&subject.title),
        priority,
        alert_type,
        tags,
        aggregation_key: &event.event_id,
    }
}

// ============================================================================
// SECTION: Slack
// ============================================================================

/// Slack-style message.
#[derive(Serialize)]
struct SlackMessage<'a> {
    /// Fallback message text.
    text: String,
    /// Single attachment with the event details.
    attachments: [SlackAttachment<'a>; 1],
}

/// Slack attachment.
#[derive(Serialize)]
struct SlackAttachment<'a> {
    /// Sidebar color.
    color: &'static str,
    /// Attachment title.
    title: &'a str,
    /// Attachment body (event description).
    text: &'a str,
    /// Field rows.
    fields: [SlackField<'a>; 3],
}

/// Slack attachment field row.
#[derive(Serialize)]
struct SlackField<'a> {
    /// Field label.
    title: &'static str,
    /// Field value.
    value: &'a str,
    /// Render side by side.
    short: bool,
}

/// Builds the Slack payload.
fn slack_message(event: &DomainEvent) -> SlackMessage<'_> {
    let subject = &event.subject;
    let color = match subject.severity {
        Some(Severity::Critical) => "danger",
        Some(Severity::High) => "warning",
        Some(Severity::Medium) => "#439FE0",
        Some(Severity::Low) | None => "good",
    };
    SlackMessage {
        text: format!("[{}] {}", event.event_type, subject.title),
        attachments: [SlackAttachment {
            color,
            title: &subject.title,
            text: subject.description.as_deref().unwrap_or_default(),
            fields: [
                SlackField {
                    title: "Status",
                    value: subject.status.as_deref().unwrap_or("Unknown"),
                    short: true,
                },
                SlackField {
                    title: "Priority",
                    value: subject.severity.map_or("None", Severity::label),
                    short: true,
                },
                SlackField {
                    title: "Assignee",
                    value: subject.assignee.as_deref().unwrap_or("Unassigned"),
                    short: true,
                },
            ],
        }],
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Collects the event's filterable attributes as ordered tags.
fn attribute_tags(event: &DomainEvent) -> BTreeMap<&'static str, &str> {
    let subject = &event.subject;
    let mut tags = BTreeMap::new();
    tags.insert("event_type", event.event_type.as_str());
    if let Some(status) = subject.status.as_deref() {
        tags.insert("status", status);
    }
    if let Some(severity) = subject.severity {
        tags.insert("severity", severity.as_str());
    }
    if let Some(category) = subject.category.as_deref() {
        tags.insert("category", category);
    }
    if let Some(assignee) = subject.assignee.as_deref() {
        tags.insert("assignee", assignee);
    }
    tags
}
