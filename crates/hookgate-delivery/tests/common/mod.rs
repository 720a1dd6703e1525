// crates/hookgate-delivery/tests/common/mod.rs
// ============================================================================
// Module: Delivery Test Helpers
// Description: Scripted transport and attempt collector for delivery tests.
// Purpose: Drive the delivery client without sockets.
// ============================================================================

//! ## Overview
//! [`ScriptedTransport`] replays per-URL response scripts and records every
//! request with the (possibly paused) tokio clock.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hookgate_core::AttemptRecorder;
use hookgate_core::CircuitConfig;
use hookgate_core::CircuitRegistry;
use hookgate_core::DeliveryAttempt;
use hookgate_core::Destination;
use hookgate_core::EventType;
use hookgate_core::HttpRequest;
use hookgate_core::HttpResponse;
use hookgate_core::HttpTransport;
use hookgate_core::MemoryAuditSink;
use hookgate_core::RetryPolicy;
use hookgate_core::TransportError;
use hookgate_delivery::DeliveryClient;
use hookgate_delivery::DeliveryConfig;
use tokio::time::Instant;

/// One scripted transport reaction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Respond immediately.
    Respond(u16, Vec<u8>),
    /// Respond after a delay.
    Delayed(Duration, u16),
    /// Fail with a transport error.
    Fail(TransportError),
    /// Never respond.
    Hang,
}

/// Request observed by the scripted transport.
#[derive(Debug, Clone)]
pub struct Observed {
    /// Request as received.
    pub request: HttpRequest,
    /// Tokio clock at receipt.
    pub at: Instant,
}

/// Transport that replays scripted steps per URL.
pub struct ScriptedTransport {
    /// Remaining steps per URL.
    routes: Mutex<HashMap<String, VecDeque<Step>>>,
    /// Step used once a route's script is exhausted.
    fallback: Step,
    /// Every request received.
    observed: Mutex<Vec<Observed>>,
}

impl ScriptedTransport {
    /// Creates a transport that answers `200 {}` by default.
    pub fn new() -> Self {
        Self::with_fallback(Step::Respond(200, b"{}".to_vec()))
    }

    /// Creates a transport with a custom default step.
    pub fn with_fallback(fallback: Step) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            fallback,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Queues steps for `url`.
    pub fn script(&self, url: &str, steps: Vec<Step>) {
        self.routes.lock().unwrap().entry(url.to_string()).or_default().extend(steps);
    }

    /// Returns every observed request.
    pub fn observed(&self) -> Vec<Observed> {
        self.observed.lock().unwrap().clone()
    }

    /// Returns the requests sent to `url`.
    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.observed()
            .into_iter()
            .filter(|observed| observed.request.url == url)
            .map(|observed| observed.request)
            .collect()
    }

    /// Returns the total request count.
    pub fn calls(&self) -> usize {
        self.observed.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let step = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());
        self.observed.lock().unwrap().push(Observed {
            request,
            at: Instant::now(),
        });
        match step {
            Step::Respond(status, body) => Ok(HttpResponse {
                status,
                body,
            }),
            Step::Delayed(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse {
                    status,
                    body: b"{}".to_vec(),
                })
            }
            Step::Fail(error) => Err(error),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Recorder that keeps every attempt.
#[derive(Default)]
pub struct CollectingRecorder {
    /// Recorded attempts.
    attempts: Mutex<Vec<DeliveryAttempt>>,
}

impl CollectingRecorder {
    /// Returns the recorded attempts.
    pub fn attempts(&self) -> Vec<DeliveryAttempt> {
        self.attempts.lock().unwrap().clone()
    }
}

impl AttemptRecorder for CollectingRecorder {
    fn record(&self, attempt: DeliveryAttempt) {
        self.attempts.lock().unwrap().push(attempt);
    }
}

/// Assembled client plus its collaborators.
pub struct Harness {
    /// Scripted transport.
    pub transport: Arc<ScriptedTransport>,
    /// Attempt collector.
    pub recorder: Arc<CollectingRecorder>,
    /// Audit collector.
    pub audit: Arc<MemoryAuditSink>,
    /// Client under test.
    pub client: Arc<DeliveryClient>,
}

/// Builds a client with zero jitter and the given breaker settings.
pub fn harness(
    transport: ScriptedTransport,
    circuit: CircuitConfig,
    config: DeliveryConfig,
) -> Harness {
    let transport = Arc::new(transport);
    let recorder = Arc::new(CollectingRecorder::default());
    let audit = Arc::new(MemoryAuditSink::new());
    let circuits = Arc::new(CircuitRegistry::new(circuit, audit.clone()));
    let client = Arc::new(DeliveryClient::new(
        transport.clone(),
        circuits,
        recorder.clone(),
        config,
    ));
    Harness {
        transport,
        recorder,
        audit,
        client,
    }
}

/// Delivery config with no jitter.
pub fn no_jitter() -> DeliveryConfig {
    DeliveryConfig {
        max_jitter: Duration::ZERO,
        ..DeliveryConfig::default()
    }
}

/// Destination subscribed to `events` with a fast retry policy.
pub fn destination(id: &str, url: &str, events: &[&str]) -> Destination {
    let mut destination = Destination::new(id, url);
    destination.events = events.iter().map(|event| EventType::new(*event)).collect();
    destination.retry = RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 100,
        backoff_multiplier: 2.0,
        max_delay_ms: 1_000,
    };
    destination
}
