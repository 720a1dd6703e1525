// crates/hookgate-failover/tests/common/mod.rs
// ============================================================================
// Module: Failover Test Helpers
// Description: Receiver fixtures and a scripted health probe.
// Purpose: Drive the coordinator and monitor without network I/O.
// ============================================================================

//! ## Overview
//! [`ScriptedProbe`] answers from per-receiver scripts and counts calls.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use hookgate_core::MemoryAuditSink;
use hookgate_core::ReceiverId;
use hookgate_failover::FailbackPolicy;
use hookgate_failover::FailoverCoordinator;
use hookgate_failover::HealthProbe;
use hookgate_failover::HealthThresholds;
use hookgate_failover::ProbeResult;
use hookgate_failover::Receiver;

/// Builds a receiver with derived URLs.
pub fn receiver(id: &str) -> Receiver {
    Receiver {
        id: ReceiverId::new(id),
        url: format!("http://{id}.internal/webhook"),
        health_url: format!("http://{id}.internal/health"),
    }
}

/// Passing probe result.
pub fn up() -> ProbeResult {
    ProbeResult::passed(200, 3)
}

/// Failing probe result.
pub fn down() -> ProbeResult {
    ProbeResult::failed(Some(503), 3, "service unavailable")
}

/// Coordinator over `ids` (first is primary) with thresholds 3/2.
pub fn coordinator(
    ids: &[&str],
    failback: FailbackPolicy,
) -> (Arc<FailoverCoordinator>, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let coordinator = FailoverCoordinator::new(
        ids.iter().map(|id| receiver(id)).collect(),
        HealthThresholds::default(),
        failback,
        audit.clone(),
    )
    .unwrap();
    (Arc::new(coordinator), audit)
}

/// Applies `count` copies of `result` to receiver `id`.
pub fn feed(coordinator: &FailoverCoordinator, id: &str, result: &ProbeResult, count: usize) {
    for _ in 0 .. count {
        coordinator.apply_probe(&ReceiverId::new(id), result.clone()).unwrap();
    }
}

/// Probe answering from per-receiver scripts; exhausted scripts pass.
#[derive(Default)]
pub struct ScriptedProbe {
    /// Remaining results per receiver.
    scripts: Mutex<HashMap<ReceiverId, VecDeque<ProbeResult>>>,
    /// Receivers that always fail.
    failing: Mutex<Vec<ReceiverId>>,
    /// Calls per receiver.
    calls: Mutex<HashMap<ReceiverId, usize>>,
}

impl ScriptedProbe {
    /// Marks `id` as permanently failing.
    pub fn fail_always(&self, id: &str) {
        self.failing.lock().unwrap().push(ReceiverId::new(id));
    }

    /// Queues results for `id`.
    pub fn script(&self, id: &str, results: Vec<ProbeResult>) {
        self.scripts.lock().unwrap().entry(ReceiverId::new(id)).or_default().extend(results);
    }

    /// Returns how often `id` was probed.
    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(&ReceiverId::new(id)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, receiver: &Receiver) -> ProbeResult {
        *self.calls.lock().unwrap().entry(receiver.id.clone()).or_default() += 1;
        if self.failing.lock().unwrap().contains(&receiver.id) {
            return down();
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&receiver.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(up)
    }
}
