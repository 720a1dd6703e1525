// crates/hookgate-failover/src/monitor.rs
// ============================================================================
// Module: Health Monitor
// Description: Periodic, cancellable receiver probing.
// Purpose: Feed probe results to the coordinator without blocking readers.
// Dependencies: async-trait, hookgate-delivery, tokio
// ============================================================================

//! ## Overview
//! [`HealthMonitor::spawn`] starts two tasks. The scheduler probes every
//! receiver concurrently on each tick and sends results over a channel; the
//! applier drains the channel into [`FailoverCoordinator::apply_probe`].
//! [`MonitorHandle::shutdown`] stops the scheduler, aborts in-flight probes,
//! and waits for the applier to drain.
//! Invariants:
//! - Probe I/O never runs under the coordinator lock.
//! - No probe result is applied after shutdown returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookgate_core::ReceiverId;
use hookgate_delivery::DeliveryClient;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;

use crate::coordinator::FailoverCoordinator;
use crate::coordinator::Receiver;
use crate::health::HealthReport;
use crate::health::ProbeResult;

/// Buffered probe results between scheduler and applier.
const RESULT_BUFFER: usize = 64;

// ============================================================================
// SECTION: Probe Interface
// ============================================================================

/// Checks one receiver's health.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probes `receiver`; failures are reported in the result, not raised.
    async fn probe(&self, receiver: &Receiver) -> ProbeResult;
}

/// Probe that issues a single GET through the delivery client.
pub struct DeliveryProbe {
    /// Shared delivery client.
    client: Arc<DeliveryClient>,
    /// Per-probe timeout.
    timeout: Duration,
}

impl DeliveryProbe {
    /// Creates a probe with the given timeout.
    #[must_use]
    pub const fn new(client: Arc<DeliveryClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for DeliveryProbe {
    async fn probe(&self, receiver: &Receiver) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.client.probe(&receiver.id, &receiver.health_url, self.timeout).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(response) => {
                let report = serde_json::from_slice::<HealthReport>(&response.body).ok();
                match report {
                    Some(report) if report.reports_down() => {
                        let mut result = ProbeResult::failed(
                            Some(response.status),
                            latency_ms,
                            format!("receiver reported status {}", report.status),
                        );
                        result.report = Some(report);
                        result
                    }
                    report => {
                        let mut result = ProbeResult::passed(response.status, latency_ms);
                        result.report = report;
                        result
                    }
                }
            }
            Err(error) => ProbeResult::failed(error.status(), latency_ms, error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Rounds
// ============================================================================

/// Probes every receiver concurrently and applies the results in order.
pub async fn probe_round(coordinator: &FailoverCoordinator, probe: &Arc<dyn HealthProbe>) {
    let mut round = spawn_round(coordinator, probe);
    while let Some(joined) = round.join_next().await {
        if let Ok((id, result)) = joined {
            let _ = coordinator.apply_probe(&id, result);
        }
    }
}

/// Spawns one probe task per receiver.
fn spawn_round(
    coordinator: &FailoverCoordinator,
    probe: &Arc<dyn HealthProbe>,
) -> JoinSet<(ReceiverId, ProbeResult)> {
    let mut round = JoinSet::new();
    for receiver in coordinator.receivers() {
        let probe = Arc::clone(probe);
        round.spawn(async move {
            let result = probe.probe(&receiver).await;
            (receiver.id, result)
        });
    }
    round
}

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// Background health monitor.
pub struct HealthMonitor;

impl HealthMonitor {
    /// Starts probing every `interval`; the first round runs immediately.
    #[must_use]
    pub fn spawn(
        coordinator: Arc<FailoverCoordinator>,
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
    ) -> MonitorHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (results, mut results_rx) = mpsc::channel(RESULT_BUFFER);

        let scheduler_coordinator = Arc::clone(&coordinator);
        let scheduler = tokio::spawn(async move {
            run_scheduler(&scheduler_coordinator, &probe, interval, shutdown_rx, results).await;
        });
        let applier = tokio::spawn(async move {
            while let Some((id, result)) = results_rx.recv().await {
                let _ = coordinator.apply_probe(&id, result);
            }
        });
        MonitorHandle {
            shutdown,
            scheduler,
            applier,
        }
    }
}

/// Ticks, probes, and forwards results until shutdown.
async fn run_scheduler(
    coordinator: &FailoverCoordinator,
    probe: &Arc<dyn HealthProbe>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    results: mpsc::Sender<(ReceiverId, ProbeResult)>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }
        let mut round = spawn_round(coordinator, probe);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    round.abort_all();
                    return;
                }
                joined = round.join_next() => match joined {
                    Some(Ok(pair)) => {
                        if results.send(pair).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(_)) => {}
                    None => break,
                },
            }
        }
    }
}

/// Handle to a running monitor.
pub struct MonitorHandle {
    /// Shutdown signal.
    shutdown: watch::Sender<bool>,
    /// Probe scheduling task.
    scheduler: JoinHandle<()>,
    /// Result applying task.
    applier: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stops probing and waits for both tasks to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.scheduler.await;
        let _ = self.applier.await;
    }
}
