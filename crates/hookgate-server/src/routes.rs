// crates/hookgate-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: axum handlers for ingress, relay, webhooks, status, and admin.
// Purpose: Translate HTTP requests into delivery-core operations.
// Dependencies: axum, serde, serde_json, hookgate-*
// ============================================================================

//! ## Overview
//! Handlers read raw bytes and decode JSON themselves so every rejection
//! carries the same `{ "error": ... }` body. The deploy webhook verifies the
//! signature over the exact received bytes before anything else.
//! Invariants:
//! - Signature failures answer `401 {"error":"unauthorized"}` regardless of cause.
//! - Admin tokens are compared in constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use hookgate_config::DestinationConfig;
use hookgate_core::AuditEvent;
use hookgate_core::CircuitSnapshot;
use hookgate_core::CircuitState;
use hookgate_core::Destination;
use hookgate_core::DestinationId;
use hookgate_core::DomainEvent;
use hookgate_core::ErrorKind;
use hookgate_core::EventType;
use hookgate_core::ReceiverId;
use hookgate_core::SIGNATURE_HEADER;
use hookgate_core::SinkShape;
use hookgate_core::WebhookError;
use hookgate_core::constant_time_eq;
use hookgate_core::now_ms;
use hookgate_delivery::ChatMessage;
use hookgate_delivery::DispatchReport;
use hookgate_failover::FailoverError;
use hookgate_failover::HealthState;
use serde::Deserialize;
use serde::Serialize;

use crate::deploy::DeploymentNotice;
use crate::state::AppState;

/// Path of the signed deployment webhook.
const DEPLOY_PATH: &str = "/webhooks/deploy";

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the HTTP router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/health", get(handle_health))
        .route("/events", post(handle_event))
        .route("/chat/messages", post(handle_chat))
        .route(DEPLOY_PATH, post(handle_deploy))
        .route("/status/failover", get(handle_failover_status))
        .route("/status/metrics", get(handle_metrics))
        .route("/status/destinations", get(handle_destinations))
        .route("/admin/failover", post(handle_admin_failover))
        .route("/admin/destinations", put(handle_replace_destinations))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

// ============================================================================
// SECTION: Response Bodies
// ============================================================================

/// Error body.
#[derive(Serialize)]
struct ErrorBody<'a> {
    /// Error message.
    error: &'a str,
    /// Error classification for upstream failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

/// Service health body.
#[derive(Serialize)]
struct HealthBody {
    /// `healthy`, `degraded`, or `unhealthy`.
    status: &'static str,
    /// Crate version.
    version: &'static str,
    /// Dependency health.
    dependencies: HealthDependencies,
}

/// Dependency section of the health body.
#[derive(Serialize)]
struct HealthDependencies {
    /// Active receiver health, when failover is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    failover: Option<FailoverHealth>,
    /// Circuit counts by state.
    circuits: CircuitCounts,
    /// Configured destinations.
    destinations: usize,
    /// Whether a chat backend is configured.
    automation: bool,
}

/// Active receiver summary.
#[derive(Serialize)]
struct FailoverHealth {
    /// Active receiver.
    active: ReceiverId,
    /// Its health verdict.
    state: HealthState,
    /// Manual failback awaiting confirmation.
    failback_pending: bool,
}

/// Circuit counts.
#[derive(Serialize)]
struct CircuitCounts {
    /// Open circuits.
    open: usize,
    /// Half-open circuits.
    half_open: usize,
}

/// One destination in the status listing.
#[derive(Serialize)]
struct DestinationStatus {
    /// Destination id.
    id: DestinationId,
    /// Payload shape.
    shape: SinkShape,
    /// Subscribed event types.
    events: Vec<EventType>,
    /// Active flag.
    active: bool,
    /// Auth scheme label (credentials are never reported).
    auth: &'static str,
    /// Circuit state.
    circuit: CircuitSnapshot,
}

/// Destination listing.
#[derive(Serialize)]
struct DestinationsBody {
    /// Destinations in order.
    destinations: Vec<DestinationStatus>,
}

/// Body of a manual failover request.
#[derive(Deserialize)]
struct FailoverRequest {
    /// Receiver to activate.
    target: ReceiverId,
}

/// Accepted webhook body.
#[derive(Serialize)]
struct AcceptedBody {
    /// Always true.
    accepted: bool,
}

/// Destination replacement body.
#[derive(Serialize)]
struct ReplacedBody {
    /// Destinations now configured.
    count: usize,
}

/// Serializes `body` with `status`.
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

/// Error response with a plain message.
fn error_response(status: StatusCode, message: &str) -> Response {
    json_response(
        status,
        &ErrorBody {
            error: message,
            kind: None,
        },
    )
}

/// Error response for a failed outbound call.
fn upstream_error(error: &WebhookError) -> Response {
    let status = match error.kind() {
        ErrorKind::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Network | ErrorKind::Http | ErrorKind::Validation => StatusCode::BAD_GATEWAY,
        ErrorKind::Auth | ErrorKind::InvalidDestination | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_response(
        status,
        &ErrorBody {
            error: &error.to_string(),
            kind: Some(error.kind()),
        },
    )
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// Reports service health and dependency summaries.
async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let snapshots = state.circuits.snapshots(Instant::now());
    let circuits = CircuitCounts {
        open: snapshots.values().filter(|snapshot| snapshot.state == CircuitState::Open).count(),
        half_open: snapshots
            .values()
            .filter(|snapshot| snapshot.state == CircuitState::HalfOpen)
            .count(),
    };
    let failover = state.failover.as_ref().map(|coordinator| {
        let status = coordinator.status();
        let active_state = status
            .receivers
            .iter()
            .find(|receiver| receiver.active)
            .map_or(HealthState::Healthy, |receiver| receiver.state);
        FailoverHealth {
            active: status.active,
            state: active_state,
            failback_pending: status.failback_pending,
        }
    });
    let active_state = failover.as_ref().map(|health| health.state);
    let (code, status) = match active_state {
        Some(HealthState::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        Some(HealthState::Degraded) => (StatusCode::OK, "degraded"),
        _ if circuits.open > 0 || circuits.half_open > 0 => (StatusCode::OK, "degraded"),
        _ => (StatusCode::OK, "healthy"),
    };
    json_response(
        code,
        &HealthBody {
            status,
            version: env!("CARGO_PKG_VERSION"),
            dependencies: HealthDependencies {
                failover,
                circuits,
                destinations: state.dispatcher.destinations().len(),
                automation: state.automation.is_some(),
            },
        },
    )
}

// ============================================================================
// SECTION: Event Ingress
// ============================================================================

/// Dispatches one domain event to matching destinations.
async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let event: DomainEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid event: {err}"));
        }
    };
    if event.event_type.as_str().trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid event: empty event_type");
    }
    let outcomes = state.dispatcher.dispatch(&event).await;
    json_response(StatusCode::OK, &DispatchReport::new(&event, &outcomes))
}

/// Relays a chat message to the automation backend.
async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(automation) = &state.automation else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "automation backend not configured");
    };
    let message: ChatMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid chat message: {err}"));
        }
    };
    match automation.send_chat(&message).await {
        Ok(reply) => json_response(StatusCode::OK, &reply),
        Err(error) => upstream_error(&error),
    }
}

// ============================================================================
// SECTION: Deploy Webhook
// ============================================================================

/// Verifies and forwards a deployment trigger.
async fn handle_deploy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let presented = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    if state.verifier.verify_request(&body, presented).is_err() {
        state.audit.record(&AuditEvent::SignatureRejected {
            timestamp_ms: now_ms(),
            path: DEPLOY_PATH.to_string(),
        });
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let notice = match DeploymentNotice::from_payload(&body) {
        Ok(notice) => notice,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, &error.to_string()),
    };
    state.audit.record(&AuditEvent::DeploymentAccepted {
        timestamp_ms: now_ms(),
        repository: notice.repository.clone(),
        git_ref: notice.git_ref.clone(),
    });
    match state.deployments.handle(notice).await {
        Ok(()) => json_response(
            StatusCode::ACCEPTED,
            &AcceptedBody {
                accepted: true,
            },
        ),
        Err(error) => upstream_error(&error),
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Reports failover state.
async fn handle_failover_status(State(state): State<Arc<AppState>>) -> Response {
    state.failover.as_ref().map_or_else(
        || error_response(StatusCode::NOT_FOUND, "failover not configured"),
        |coordinator| json_response(StatusCode::OK, &coordinator.status()),
    )
}

/// Reports the delivery metrics window.
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, &state.metrics.snapshot())
}

/// Lists destinations with their circuit state.
async fn handle_destinations(State(state): State<Arc<AppState>>) -> Response {
    let now = Instant::now();
    let destinations = state
        .dispatcher
        .destinations()
        .snapshot()
        .iter()
        .map(|destination| DestinationStatus {
            id: destination.id.clone(),
            shape: destination.shape,
            events: destination.events.clone(),
            active: destination.active,
            auth: destination.auth.scheme(),
            circuit: state.circuits.snapshot(&destination.id, now),
        })
        .collect();
    json_response(
        StatusCode::OK,
        &DestinationsBody {
            destinations,
        },
    )
}

// ============================================================================
// SECTION: Admin
// ============================================================================

/// Checks the admin bearer token.
fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.admin_token else {
        return true;
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();
    constant_time_eq(presented.as_bytes(), expected.as_bytes())
}

/// Forces a receiver active.
async fn handle_admin_failover(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let Some(coordinator) = &state.failover else {
        return error_response(StatusCode::NOT_FOUND, "failover not configured");
    };
    let request: FailoverRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid request: {err}"));
        }
    };
    match coordinator.trigger_failover(&request.target) {
        Ok(status) => json_response(StatusCode::OK, &status),
        Err(error @ FailoverError::UnknownReceiver(_)) => {
            error_response(StatusCode::NOT_FOUND, &error.to_string())
        }
        Err(error) => error_response(StatusCode::BAD_REQUEST, &error.to_string()),
    }
}

/// Replaces the destination set atomically.
async fn handle_replace_destinations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let configs: Vec<DestinationConfig> = match serde_json::from_slice(&body) {
        Ok(configs) => configs,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid destinations: {err}"),
            );
        }
    };
    let lookup = &*state.secrets;
    let built: Result<Vec<Destination>, _> =
        configs.iter().map(|config| config.build(lookup)).collect();
    let destinations = match built {
        Ok(destinations) => destinations,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, &error.to_string()),
    };
    let mut ids: Vec<DestinationId> =
        destinations.iter().map(|destination| destination.id.clone()).collect();
    if let Some(automation) = &state.automation {
        ids.push(automation.destination().id.clone());
    }
    let count = destinations.len();
    if let Err(error) = state.dispatcher.destinations().replace(destinations) {
        return error_response(StatusCode::BAD_REQUEST, &error.to_string());
    }
    state.circuits.retain(&ids);
    state.audit.record(&AuditEvent::DestinationsReplaced {
        timestamp_ms: now_ms(),
        count,
    });
    json_response(
        StatusCode::OK,
        &ReplacedBody {
            count,
        },
    )
}
