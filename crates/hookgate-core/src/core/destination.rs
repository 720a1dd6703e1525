// crates/hookgate-core/src/core/destination.rs
// ============================================================================
// Module: Hookgate Destinations
// Description: Outbound webhook destinations with auth, filters, and retry policy.
// Purpose: Describe where and how an event is delivered.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! A [`Destination`] is replaced wholesale on update and never mutated during
//! a delivery. Subscription and filter checks decide whether an event reaches
//! it; the [`RetryPolicy`] bounds how hard the delivery client tries.
//! Invariants:
//! - `retry.max_attempts >= 1`.
//! - Backoff delays never decrease across attempts of one send.
//! - Credentials never appear in `Debug` output.
//!
//! Security posture: destination URLs and credentials come from operator
//! configuration and are validated before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::event::DomainEvent;
use crate::core::event::EventSubject;
use crate::core::event::Severity;
use crate::core::identifiers::DestinationId;
use crate::core::identifiers::EventType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Subscription entry that matches every event type.
pub const WILDCARD_EVENT: &str = "*";
/// Upper bound on configured attempts per send.
pub const MAX_RETRY_ATTEMPTS: u32 = 20;
/// Upper bound on the backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;
/// Upper bound on any single backoff delay in milliseconds.
pub const MAX_BACKOFF_DELAY_MS: u64 = 10 * 60 * 1_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Destination validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    /// A field failed validation.
    #[error("invalid destination {id}: {reason}")]
    Invalid {
        /// Destination identifier (may be empty when the id itself is invalid).
        id: String,
        /// Validation failure reason.
        reason: String,
    },
    /// Two destinations share an identifier.
    #[error("duplicate destination id: {0}")]
    Duplicate(DestinationId),
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Authentication attached to every request sent to a destination.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthDescriptor {
    /// No authentication headers.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// Bearer token.
        token: String,
    },
    /// `Authorization: Basic base64(username:password)`.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Custom header carrying an API key.
    ApiKey {
        /// Header name.
        header: String,
        /// Header value.
        value: String,
    },
}

impl AuthDescriptor {
    /// Returns a stable label for the auth scheme.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer {
                ..
            } => "bearer",
            Self::Basic {
                ..
            } => "basic",
            Self::ApiKey {
                ..
            } => "api_key",
        }
    }

    /// Validates credential presence and header syntax.
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::None => Ok(()),
            Self::Bearer {
                token,
            } => {
                if token.trim().is_empty() {
                    return Err("bearer token must be non-empty".to_string());
                }
                Ok(())
            }
            Self::Basic {
                username, ..
            } => {
                if username.is_empty() || username.contains(':') {
                    return Err("basic username must be non-empty and contain no ':'".to_string());
                }
                Ok(())
            }
            Self::ApiKey {
                header,
                value,
            } => {
                if !is_header_token(header) {
                    return Err(format!("api_key header name is invalid: {header}"));
                }
                if value.trim().is_empty() {
                    return Err("api_key value must be non-empty".to_string());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for AuthDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer {
                ..
            } => f.debug_struct("Bearer").field("token", &"[REDACTED]").finish(),
            Self::Basic {
                username, ..
            } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::ApiKey {
                header, ..
            } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("value", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Returns true when `name` is a valid HTTP header field name.
fn is_header_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|byte| {
            byte.is_ascii_alphanumeric()
                || matches!(
                    byte,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

// ============================================================================
// SECTION: Sink Shape
// ============================================================================

/// Wire shape a destination expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkShape {
    /// Raw event forwarded as JSON.
    #[default]
    Generic,
    /// Sentry-style issue report.
    Sentry,
    /// Datadog-style monitoring event.
    #[serde(rename = "datadog")]
    DataDog,
    /// Slack-style message with an attachment.
    Slack,
}

impl SinkShape {
    /// Returns a stable label for the shape.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Sentry => "sentry",
            Self::DataDog => "datadog",
            Self::Slack => "slack",
        }
    }
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Optional attribute filters; all configured fields must match.
///
/// # Invariants
/// - Empty lists impose no constraint.
/// - A configured field rejects events that lack a value for it.
/// - String comparisons ignore ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventFilters {
    /// Accepted workflow statuses.
    #[serde(default)]
    pub status: Vec<String>,
    /// Accepted severities.
    #[serde(default)]
    pub severity: Vec<Severity>,
    /// Accepted categories.
    #[serde(default)]
    pub category: Vec<String>,
    /// Accepted assignees.
    #[serde(default)]
    pub assignee: Vec<String>,
}

impl EventFilters {
    /// Returns true when no filter field is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
            && self.severity.is_empty()
            && self.category.is_empty()
            && self.assignee.is_empty()
    }

    /// Returns true when the subject satisfies every configured filter.
    #[must_use]
    pub fn matches(&self, subject: &EventSubject) -> bool {
        matches_text(&self.status, subject.status.as_deref())
            && (self.severity.is_empty()
                || subject.severity.is_some_and(|severity| self.severity.contains(&severity)))
            && matches_text(&self.category, subject.category.as_deref())
            && matches_text(&self.assignee, subject.assignee.as_deref())
    }
}

/// Case-insensitive membership check for optional text attributes.
fn matches_text(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty()
        || value.is_some_and(|value| allowed.iter().any(|entry| entry.eq_ignore_ascii_case(value)))
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Retry and backoff settings for one destination.
///
/// # Invariants
/// - `max_attempts >= 1`, `backoff_multiplier >= 1.0`, `max_delay_ms >= base_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total network attempts per send, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Growth factor applied per retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound on a single backoff delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            backoff_multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Returns the backoff delay before the retry that follows `failed_attempt`.
    ///
    /// The delay is `min(base * multiplier^(failed_attempt - 1), max)` and is
    /// therefore non-decreasing in `failed_attempt` for valid policies.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Delays are bounded by MAX_BACKOFF_DELAY_MS, well within f64 precision."
    )]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let max = Duration::from_millis(self.max_delay_ms);
        let exponent = i32::try_from(failed_attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        let millis = (self.base_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        if !millis.is_finite() || millis < 0.0 {
            return max;
        }
        Duration::try_from_secs_f64(millis / 1_000.0).map_or(max, |delay| delay.min(max))
    }

    /// Validates policy bounds.
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(format!("retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"));
        }
        if !self.backoff_multiplier.is_finite()
            || self.backoff_multiplier < 1.0
            || self.backoff_multiplier > MAX_BACKOFF_MULTIPLIER
        {
            return Err(format!(
                "retry.backoff_multiplier must be between 1.0 and {MAX_BACKOFF_MULTIPLIER}"
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("retry.max_delay_ms must be >= retry.base_delay_ms".to_string());
        }
        if self.max_delay_ms > MAX_BACKOFF_DELAY_MS {
            return Err(format!("retry.max_delay_ms must be <= {MAX_BACKOFF_DELAY_MS}"));
        }
        Ok(())
    }
}

/// Default attempts per send.
const fn default_max_attempts() -> u32 {
    3
}

/// Default first retry delay.
const fn default_base_delay_ms() -> u64 {
    500
}

/// Default backoff multiplier.
const fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Default backoff ceiling.
const fn default_max_delay_ms() -> u64 {
    30_000
}

// ============================================================================
// SECTION: Destination
// ============================================================================

/// Configured outbound webhook target.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Destination identifier.
    pub id: DestinationId,
    /// Target URL (`http` or `https`).
    pub url: String,
    /// Authentication attached to each request.
    pub auth: AuthDescriptor,
    /// Wire shape of the payload.
    pub shape: SinkShape,
    /// Subscribed event types (`*` subscribes to all).
    pub events: Vec<EventType>,
    /// Attribute filters.
    pub filters: EventFilters,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Inactive destinations receive nothing.
    pub active: bool,
}

impl Destination {
    /// Creates an active generic destination with default policy and no subscriptions.
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: DestinationId::new(id),
            url: url.into(),
            auth: AuthDescriptor::None,
            shape: SinkShape::Generic,
            events: Vec::new(),
            filters: EventFilters::default(),
            retry: RetryPolicy::default(),
            active: true,
        }
    }

    /// Returns true when the destination subscribes to the event type.
    #[must_use]
    pub fn subscribes_to(&self, event_type: &EventType) -> bool {
        self.events
            .iter()
            .any(|subscribed| subscribed == event_type || subscribed.as_str() == WILDCARD_EVENT)
    }

    /// Returns true when the event should be delivered to this destination.
    #[must_use]
    pub fn accepts(&self, event: &DomainEvent) -> bool {
        self.active && self.subscribes_to(&event.event_type) && self.filters.matches(&event.subject)
    }

    /// Validates identifier, URL, credentials, subscriptions, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Invalid`] describing the first failing field.
    pub fn validate(&self) -> Result<(), DestinationError> {
        let invalid = |reason: String| DestinationError::Invalid {
            id: self.id.to_string(),
            reason,
        };
        if self.id.as_str().trim().is_empty() {
            return Err(invalid("id must be non-empty".to_string()));
        }
        let url = Url::parse(&self.url).map_err(|err| invalid(format!("url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("url scheme must be http or https: {}", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("url must include a host".to_string()));
        }
        if self.events.is_empty() {
            return Err(invalid("events must list at least one event type".to_string()));
        }
        if self.events.iter().any(|event| event.as_str().trim().is_empty()) {
            return Err(invalid("event types must be non-empty".to_string()));
        }
        self.auth.validate().map_err(invalid)?;
        self.retry.validate().map_err(invalid)?;
        Ok(())
    }
}
