// crates/hookgate-core/src/core/mod.rs
// ============================================================================
// Module: Hookgate Core Types
// Description: Canonical destination, event, and error structures.
// Purpose: Provide stable, serializable types shared by every Hookgate crate.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! Core types define outbound destinations, the domain events fanned out to
//! them, per-attempt delivery records, and the delivery error taxonomy.
//! These types are the source of truth for config parsing and the HTTP
//! status surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod attempt;
pub mod destination;
pub mod error;
pub mod event;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attempt::DeliveryAttempt;
pub use destination::AuthDescriptor;
pub use destination::Destination;
pub use destination::DestinationError;
pub use destination::EventFilters;
pub use destination::RetryPolicy;
pub use destination::SinkShape;
pub use destination::WILDCARD_EVENT;
pub use error::ErrorKind;
pub use error::WebhookError;
pub use event::DomainEvent;
pub use event::EventSubject;
pub use event::Severity;
pub use identifiers::DestinationId;
pub use identifiers::EventType;
pub use identifiers::ReceiverId;
pub use time::now_ms;
