// crates/hookgate-delivery/src/client.rs
// ============================================================================
// Module: Delivery Client
// Description: Single-destination send with deadlines, retry/backoff, and circuit gating.
// Purpose: Deliver one logical message reliably without hammering failing destinations.
// Dependencies: hookgate-core, rand, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`DeliveryClient::send`] runs a plain iterative retry loop under an
//! overall deadline. Every network attempt carries its own timeout and emits
//! one [`DeliveryAttempt`]. The circuit is consulted once before the loop and
//! updated once with the terminal outcome.
//! Invariants:
//! - At most `retry.max_attempts` network attempts per send.
//! - Backoff delays within one send never decrease.
//! - The overall deadline aborts in-flight network calls and backoff sleeps.
//! - Circuit-open rejections make no network call and record no attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use hookgate_core::AttemptRecorder;
use hookgate_core::CircuitRegistry;
use hookgate_core::DeliveryAttempt;
use hookgate_core::Destination;
use hookgate_core::DestinationId;
use hookgate_core::EventType;
use hookgate_core::HttpMethod;
use hookgate_core::HttpRequest;
use hookgate_core::HttpResponse;
use hookgate_core::HttpTransport;
use hookgate_core::ReceiverId;
use hookgate_core::TransportError;
use hookgate_core::WebhookError;
use hookgate_core::now_ms;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::automation::AutomationReply;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event type recorded for failover health probes.
pub const HEALTH_PROBE_EVENT: &str = "health.probe";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Deadlines and jitter applied to every send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Deadline for a whole send, including retries and backoff.
    pub overall_timeout: Duration,
    /// Deadline for a single network attempt.
    pub attempt_timeout: Duration,
    /// Upper bound on random jitter added to each backoff delay.
    pub max_jitter: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(15),
            attempt_timeout: Duration::from_secs(10),
            max_jitter: Duration::from_millis(250),
        }
    }
}

// ============================================================================
// SECTION: Request / Response
// ============================================================================

/// Shape a successful response body must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseSchema {
    /// Any body is accepted.
    #[default]
    Any,
    /// Body must parse as JSON.
    Json,
    /// Body must be `{ "success": bool, "response"?: string }`.
    AutomationReply,
}

impl ResponseSchema {
    /// Validates a 2xx response body.
    fn validate(self, body: &[u8]) -> Result<(), WebhookError> {
        match self {
            Self::Any => Ok(()),
            Self::Json => serde_json::from_slice::<Value>(body)
                .map(|_| ())
                .map_err(|err| WebhookError::Validation(format!("expected json body: {err}"))),
            Self::AutomationReply => serde_json::from_slice::<AutomationReply>(body)
                .map(|_| ())
                .map_err(|err| WebhookError::Validation(format!("unexpected reply shape: {err}"))),
        }
    }
}

/// Logical message handed to [`DeliveryClient::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Body bytes, sent unchanged on every attempt.
    pub body: Vec<u8>,
    /// Extra headers, including destination auth.
    pub headers: Vec<(String, String)>,
    /// Expected success body shape.
    pub expect: ResponseSchema,
    /// Event type recorded with each attempt.
    pub event_type: Option<EventType>,
}

impl OutboundRequest {
    /// Creates a JSON POST with no extra headers.
    #[must_use]
    pub const fn post_json(body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            body,
            headers: Vec::new(),
            expect: ResponseSchema::Any,
            event_type: None,
        }
    }

    /// Appends headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the expected response schema.
    #[must_use]
    pub const fn expecting(mut self, expect: ResponseSchema) -> Self {
        self.expect = expect;
        self
    }

    /// Sets the event type recorded with each attempt.
    #[must_use]
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }
}

/// Successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    /// HTTP status (2xx).
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ResponseBody {
    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Validation`] when the body does not decode.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| WebhookError::Validation(format!("invalid response body: {err}")))
    }
}

// ============================================================================
// SECTION: Delivery Client
// ============================================================================

/// Sends requests to destinations through an [`HttpTransport`].
pub struct DeliveryClient {
    /// Network transport.
    transport: Arc<dyn HttpTransport>,
    /// Per-destination circuit breakers.
    circuits: Arc<CircuitRegistry>,
    /// Attempt sink.
    recorder: Arc<dyn AttemptRecorder>,
    /// Deadlines and jitter.
    config: DeliveryConfig,
}

impl DeliveryClient {
    /// Creates a client.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        circuits: Arc<CircuitRegistry>,
        recorder: Arc<dyn AttemptRecorder>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            transport,
            circuits,
            recorder,
            config,
        }
    }

    /// Returns the circuit registry.
    #[must_use]
    pub const fn circuits(&self) -> &Arc<CircuitRegistry> {
        &self.circuits
    }

    /// Returns the deadline configuration.
    #[must_use]
    pub const fn config(&self) -> DeliveryConfig {
        self.config
    }

    /// Sends `request` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidDestination`] for an empty URL,
    /// [`WebhookError::CircuitOpen`] while the circuit is open, or the last
    /// attempt's error once retries are exhausted or the deadline passes.
    pub async fn send(
        &self,
        destination: &Destination,
        request: OutboundRequest,
    ) -> Result<ResponseBody, WebhookError> {
        if destination.url.trim().is_empty() {
            return Err(WebhookError::InvalidDestination(format!(
                "destination {} has an empty url",
                destination.id
            )));
        }
        let started = Instant::now();
        self.circuits.admit(&destination.id, started.into_std())?;

        let progress = Progress::default();
        let result = match tokio::time::timeout(
            self.config.overall_timeout,
            self.run_attempts(destination, &request, &progress),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                let error = WebhookError::Timeout {
                    elapsed_ms: millis(started.elapsed()),
                };
                if let Some(in_flight) = progress.take() {
                    self.recorder.record(DeliveryAttempt::failure(
                        now_ms(),
                        destination.id.clone(),
                        request.event_type.clone(),
                        in_flight.attempt,
                        &error,
                        millis(in_flight.started.elapsed()),
                    ));
                }
                Err(error)
            }
        };

        match &result {
            Ok(_) => self.circuits.record_success(&destination.id),
            Err(_) => self.circuits.record_failure(&destination.id, Instant::now().into_std()),
        }
        result
    }

    /// Issues one health probe: a GET with no retry and no circuit gating.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-2xx status, timeout, or
    /// transport failure.
    pub async fn probe(
        &self,
        receiver: &ReceiverId,
        url: &str,
        timeout: Duration,
    ) -> Result<ResponseBody, WebhookError> {
        let id = DestinationId::new(receiver.as_str());
        let event_type = Some(EventType::new(HEALTH_PROBE_EVENT));
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: Vec::new(),
            timeout,
        };
        let started = Instant::now();
        let result = self.execute(request, timeout, ResponseSchema::Any).await;
        self.record(&id, event_type, 1, &result, millis(started.elapsed()));
        result
    }

    /// Runs the retry loop for one send.
    async fn run_attempts(
        &self,
        destination: &Destination,
        request: &OutboundRequest,
        progress: &Progress,
    ) -> Result<ResponseBody, WebhookError> {
        let max_attempts = destination.retry.max_attempts.max(1);
        let mut previous_delay = Duration::ZERO;
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            progress.begin(attempt, started);
            let result = self
                .execute(
                    self.build_request(destination, request),
                    self.config.attempt_timeout,
                    request.expect,
                )
                .await;
            progress.take();
            self.record(
                &destination.id,
                request.event_type.clone(),
                attempt,
                &result,
                millis(started.elapsed()),
            );
            match result {
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = (destination.retry.delay_for(attempt) + self.jitter())
                        .max(previous_delay);
                    previous_delay = delay;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Builds the transport request for one attempt.
    fn build_request(&self, destination: &Destination, request: &OutboundRequest) -> HttpRequest {
        let mut headers = Vec::with_capacity(request.headers.len() + 1);
        if request.method == HttpMethod::Post {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers.extend(request.headers.iter().cloned());
        HttpRequest {
            method: request.method,
            url: destination.url.clone(),
            headers,
            body: request.body.clone(),
            timeout: self.config.attempt_timeout,
        }
    }

    /// Executes one network attempt under `timeout` and classifies the outcome.
    async fn execute(
        &self,
        request: HttpRequest,
        timeout: Duration,
        expect: ResponseSchema,
    ) -> Result<ResponseBody, WebhookError> {
        let timed_out = WebhookError::Timeout {
            elapsed_ms: millis(timeout),
        };
        match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => Err(timed_out),
            Ok(Err(TransportError::Connect(message) | TransportError::Body(message))) => {
                Err(WebhookError::Network(message))
            }
            Ok(Ok(response)) => classify(response, expect),
        }
    }

    /// Emits an attempt record.
    fn record(
        &self,
        id: &DestinationId,
        event_type: Option<EventType>,
        attempt: u32,
        result: &Result<ResponseBody, WebhookError>,
        latency_ms: u64,
    ) {
        let record = match result {
            Ok(response) => DeliveryAttempt::success(
                now_ms(),
                id.clone(),
                event_type,
                attempt,
                response.status,
                latency_ms,
            ),
            Err(error) => DeliveryAttempt::failure(
                now_ms(),
                id.clone(),
                event_type,
                attempt,
                error,
                latency_ms,
            ),
        };
        self.recorder.record(record);
    }

    /// Draws a random jitter in `[0, max_jitter]`.
    fn jitter(&self) -> Duration {
        let max = millis(self.config.max_jitter);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

/// Maps a transport response to success or an HTTP/validation error.
fn classify(response: HttpResponse, expect: ResponseSchema) -> Result<ResponseBody, WebhookError> {
    if !(200..300).contains(&response.status) {
        return Err(WebhookError::http(response.status));
    }
    expect.validate(&response.body)?;
    Ok(ResponseBody {
        status: response.status,
        body: response.body,
    })
}

/// Converts a duration to whole milliseconds, saturating.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Attempt Progress
// ============================================================================

/// Attempt currently on the wire.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    /// 1-based attempt number.
    attempt: u32,
    /// Attempt start.
    started: Instant,
}

/// Tracks the in-flight attempt so a deadline abort can still record it.
#[derive(Debug, Default)]
struct Progress {
    /// In-flight attempt, cleared once the attempt resolves.
    current: Mutex<Option<InFlight>>,
}

impl Progress {
    /// Marks an attempt as started.
    fn begin(&self, attempt: u32, started: Instant) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(InFlight {
            attempt,
            started,
        });
    }

    /// Clears and returns the in-flight attempt.
    fn take(&self) -> Option<InFlight> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
