// crates/hookgate-delivery/src/fanout.rs
// ============================================================================
// Module: Event Fan-out
// Description: Atomic destination set and concurrent per-destination dispatch.
// Purpose: Deliver one domain event to every matching destination independently.
// Dependencies: hookgate-core, serde, tokio
// ============================================================================

//! ## Overview
//! [`FanoutDispatcher::dispatch`] takes a snapshot of the [`DestinationSet`],
//! selects destinations that accept the event, shapes and authenticates one
//! request per destination, and sends them concurrently. It resolves once
//! every send has finished and reports one outcome per destination.
//! Invariants:
//! - A replace never exposes a partially updated destination list.
//! - Outcomes are reported in destination-set order.
//! - A failed or panicked send affects only its own outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use hookgate_core::AuditEvent;
use hookgate_core::AuditSink;
use hookgate_core::Destination;
use hookgate_core::DestinationError;
use hookgate_core::DestinationId;
use hookgate_core::DomainEvent;
use hookgate_core::ErrorKind;
use hookgate_core::EventType;
use hookgate_core::WebhookError;
use hookgate_core::now_ms;
use serde::Serialize;

use crate::auth::auth_headers;
use crate::client::DeliveryClient;
use crate::client::OutboundRequest;
use crate::format::format_event;

// ============================================================================
// SECTION: Destination Set
// ============================================================================

/// Validated destination list, swapped whole on update.
#[derive(Debug, Default)]
pub struct DestinationSet {
    /// Current list.
    current: RwLock<Arc<Vec<Destination>>>,
}

impl DestinationSet {
    /// Creates a set from validated destinations.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] if any destination is invalid or ids repeat.
    pub fn new(destinations: Vec<Destination>) -> Result<Self, DestinationError> {
        validate_all(&destinations)?;
        Ok(Self {
            current: RwLock::new(Arc::new(destinations)),
        })
    }

    /// Returns the current list.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Destination>> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the list atomically after validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] and leaves the current list in place on
    /// any validation failure.
    pub fn replace(&self, destinations: Vec<Destination>) -> Result<(), DestinationError> {
        validate_all(&destinations)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(destinations);
        Ok(())
    }

    /// Returns the destination ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<DestinationId> {
        self.snapshot().iter().map(|destination| destination.id.clone()).collect()
    }

    /// Returns the number of destinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validates each destination and rejects duplicate ids.
fn validate_all(destinations: &[Destination]) -> Result<(), DestinationError> {
    let mut seen = HashSet::with_capacity(destinations.len());
    for destination in destinations {
        destination.validate()?;
        if !seen.insert(&destination.id) {
            return Err(DestinationError::Duplicate(destination.id.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of delivering one event to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Destination identifier.
    pub destination_id: DestinationId,
    /// HTTP status on success, or the terminal error.
    pub result: Result<u16, WebhookError>,
}

impl DispatchOutcome {
    /// Returns true when the destination accepted the event.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Serializable per-destination outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Destination identifier.
    pub destination_id: DestinationId,
    /// Whether delivery succeeded.
    pub delivered: bool,
    /// HTTP status, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Error classification for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error detail for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DispatchOutcome> for OutcomeSummary {
    fn from(outcome: &DispatchOutcome) -> Self {
        match &outcome.result {
            Ok(status) => Self {
                destination_id: outcome.destination_id.clone(),
                delivered: true,
                status: Some(*status),
                error_kind: None,
                error: None,
            },
            Err(error) => Self {
                destination_id: outcome.destination_id.clone(),
                delivered: false,
                status: error.status(),
                error_kind: Some(error.kind()),
                error: Some(error.to_string()),
            },
        }
    }
}

/// Serializable report for one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Producer event identifier.
    pub event_id: String,
    /// Event type.
    pub event_type: EventType,
    /// Destinations that matched the event.
    pub matched: usize,
    /// Destinations that accepted the event.
    pub delivered: usize,
    /// Per-destination outcomes.
    pub outcomes: Vec<OutcomeSummary>,
}

impl DispatchReport {
    /// Builds a report from dispatch outcomes.
    #[must_use]
    pub fn new(event: &DomainEvent, outcomes: &[DispatchOutcome]) -> Self {
        Self {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            matched: outcomes.len(),
            delivered: outcomes.iter().filter(|outcome| outcome.is_delivered()).count(),
            outcomes: outcomes.iter().map(OutcomeSummary::from).collect(),
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Fans domain events out to matching destinations.
pub struct FanoutDispatcher {
    /// Shared delivery client.
    client: Arc<DeliveryClient>,
    /// Destination list.
    destinations: Arc<DestinationSet>,
    /// Sink for terminal delivery failures.
    audit: Arc<dyn AuditSink>,
}

impl FanoutDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        client: Arc<DeliveryClient>,
        destinations: Arc<DestinationSet>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            client,
            destinations,
            audit,
        }
    }

    /// Returns the destination set.
    #[must_use]
    pub const fn destinations(&self) -> &Arc<DestinationSet> {
        &self.destinations
    }

    /// Returns the destinations that would receive `event`.
    #[must_use]
    pub fn matching(&self, event: &DomainEvent) -> Vec<Destination> {
        self.destinations
            .snapshot()
            .iter()
            .filter(|destination| destination.accepts(event))
            .cloned()
            .collect()
    }

    /// Delivers `event` to every matching destination concurrently.
    pub async fn dispatch(&self, event: &DomainEvent) -> Vec<DispatchOutcome> {
        let mut pending = Vec::new();
        for destination in self.matching(event) {
            let client = Arc::clone(&self.client);
            let event = event.clone();
            let destination_id = destination.id.clone();
            let handle = tokio::spawn(async move {
                let request = build_request(&destination, &event)?;
                client.send(&destination, request).await.map(|response| response.status)
            });
            pending.push((destination_id, handle));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (destination_id, handle) in pending {
            let result = handle.await.unwrap_or_else(|err| {
                Err(WebhookError::Internal(format!("delivery task failed: {err}")))
            });
            if let Err(error) = &result {
                self.audit.record(&AuditEvent::DeliveryFailed {
                    timestamp_ms: now_ms(),
                    destination_id: destination_id.clone(),
                    event_type: event.event_type.clone(),
                    error_kind: error.kind(),
                });
            }
            outcomes.push(DispatchOutcome {
                destination_id,
                result,
            });
        }
        outcomes
    }
}

/// Shapes and authenticates the request for one destination.
fn build_request(
    destination: &Destination,
    event: &DomainEvent,
) -> Result<OutboundRequest, WebhookError> {
    let body = format_event(destination.shape, event)?;
    Ok(OutboundRequest::post_json(body)
        .with_headers(auth_headers(&destination.auth))
        .with_event_type(event.event_type.clone()))
}
