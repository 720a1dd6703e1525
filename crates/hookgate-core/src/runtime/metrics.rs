// crates/hookgate-core/src/runtime/metrics.rs
// ============================================================================
// Module: Hookgate Delivery Metrics
// Description: Rolling window of delivery attempts with aggregate statistics.
// Purpose: Answer operator questions about delivery health with bounded memory.
// Dependencies: serde, crate::interfaces
// ============================================================================

//! ## Overview
//! [`DeliveryMetrics`] keeps the most recent attempts, bounded by both count
//! and age, and computes aggregates on demand. Oldest entries are evicted
//! first.
//! Invariants:
//! - The window never holds more than `max_attempts` entries.
//! - Snapshots are read-only; nothing here feeds back into delivery decisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;

use crate::core::attempt::DeliveryAttempt;
use crate::interfaces::AttemptRecorder;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Window bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Maximum attempts retained.
    pub max_attempts: usize,
    /// Maximum attempt age retained.
    pub max_age: Duration,
    /// Number of recent errors reported in snapshots.
    pub recent_errors: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1_000,
            max_age: Duration::from_secs(3_600),
            recent_errors: 20,
        }
    }
}

// ============================================================================
// SECTION: Snapshot Types
// ============================================================================

/// Latency statistics in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LatencySummary {
    /// Mean latency.
    pub average_ms: f64,
    /// Median latency (nearest rank).
    pub p50_ms: u64,
    /// 95th percentile latency (nearest rank).
    pub p95_ms: u64,
    /// 99th percentile latency (nearest rank).
    pub p99_ms: u64,
}

/// Per-key attempt counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BreakdownStats {
    /// Attempts in the window.
    pub attempts: u64,
    /// Successful attempts.
    pub successes: u64,
    /// Failed attempts.
    pub failures: u64,
    /// Mean latency in milliseconds.
    pub average_latency_ms: f64,
}

/// Aggregates over the current window.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Attempts in the window.
    pub total_attempts: u64,
    /// Successful attempts.
    pub successes: u64,
    /// Failed attempts.
    pub failures: u64,
    /// `successes / total_attempts`, or 0 when empty.
    pub success_rate: f64,
    /// `failures / total_attempts`, or 0 when empty.
    pub error_rate: f64,
    /// Latency statistics.
    pub latency: LatencySummary,
    /// Breakdown keyed by destination id.
    pub by_destination: BTreeMap<String, BreakdownStats>,
    /// Breakdown keyed by event type; sends without one use `unspecified`.
    pub by_event_type: BTreeMap<String, BreakdownStats>,
    /// Most recent failures, newest first.
    pub recent_errors: Vec<DeliveryAttempt>,
}

/// Event type key for attempts sent without an event type.
const UNSPECIFIED_EVENT: &str = "unspecified";

// ============================================================================
// SECTION: Rolling Window
// ============================================================================

/// Rolling window of delivery attempts.
#[derive(Debug)]
pub struct DeliveryMetrics {
    /// Window bounds.
    config: MetricsConfig,
    /// Attempts with their monotonic record time, oldest first.
    window: Mutex<VecDeque<(Instant, DeliveryAttempt)>>,
}

impl DeliveryMetrics {
    /// Creates an empty window.
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Records an attempt observed at `now`.
    pub fn record_at(&self, attempt: DeliveryAttempt, now: Instant) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.push_back((now, attempt));
        self.evict(&mut window, now);
    }

    /// Returns the number of retained attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns aggregates over the window as of now.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Returns aggregates over the window as of `now`.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> MetricsSnapshot {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict(&mut window, now);

        let mut snapshot = MetricsSnapshot::default();
        let mut latencies = Vec::with_capacity(window.len());
        let mut destination_totals: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut event_totals: BTreeMap<String, Accumulator> = BTreeMap::new();
        for (_, attempt) in window.iter() {
            let success = attempt.is_success();
            snapshot.total_attempts += 1;
            if success {
                snapshot.successes += 1;
            } else {
                snapshot.failures += 1;
            }
            latencies.push(attempt.latency_ms);
            destination_totals
                .entry(attempt.destination_id.to_string())
                .or_default()
                .add(success, attempt.latency_ms);
            let event_key = attempt
                .event_type
                .as_ref()
                .map_or_else(|| UNSPECIFIED_EVENT.to_string(), ToString::to_string);
            event_totals.entry(event_key).or_default().add(success, attempt.latency_ms);
        }

        snapshot.success_rate = ratio(snapshot.successes, snapshot.total_attempts);
        snapshot.error_rate = ratio(snapshot.failures, snapshot.total_attempts);
        snapshot.latency = summarize(&mut latencies);
        snapshot.by_destination =
            destination_totals.into_iter().map(|(key, acc)| (key, acc.finish())).collect();
        snapshot.by_event_type =
            event_totals.into_iter().map(|(key, acc)| (key, acc.finish())).collect();
        snapshot.recent_errors = window
            .iter()
            .rev()
            .filter(|(_, attempt)| !attempt.is_success())
            .take(self.config.recent_errors)
            .map(|(_, attempt)| attempt.clone())
            .collect();
        snapshot
    }

    /// Drops entries beyond the count bound or older than the age bound.
    fn evict(&self, window: &mut VecDeque<(Instant, DeliveryAttempt)>, now: Instant) {
        while window.len() > self.config.max_attempts {
            window.pop_front();
        }
        while let Some((recorded, _)) = window.front()
            && now.saturating_duration_since(*recorded) > self.config.max_age
        {
            window.pop_front();
        }
    }
}

impl AttemptRecorder for DeliveryMetrics {
    fn record(&self, attempt: DeliveryAttempt) {
        self.record_at(attempt, Instant::now());
    }
}

// ============================================================================
// SECTION: Aggregation Helpers
// ============================================================================

/// Running totals for one breakdown key.
#[derive(Debug, Default)]
struct Accumulator {
    /// Attempt count.
    attempts: u64,
    /// Success count.
    successes: u64,
    /// Latency sum in milliseconds.
    latency_sum: u64,
}

impl Accumulator {
    /// Adds one attempt.
    fn add(&mut self, success: bool, latency_ms: u64) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
        self.latency_sum = self.latency_sum.saturating_add(latency_ms);
    }

    /// Converts totals into reported stats.
    fn finish(self) -> BreakdownStats {
        BreakdownStats {
            attempts: self.attempts,
            successes: self.successes,
            failures: self.attempts - self.successes,
            average_latency_ms: ratio(self.latency_sum, self.attempts),
        }
    }
}

/// Returns `numerator / denominator`, or 0 when the denominator is 0.
#[allow(clippy::cast_precision_loss, reason = "Window counts are far below 2^52.")]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// Computes average and nearest-rank percentiles, sorting `latencies` in place.
fn summarize(latencies: &mut [u64]) -> LatencySummary {
    if latencies.is_empty() {
        return LatencySummary::default();
    }
    latencies.sort_unstable();
    let sum = latencies.iter().fold(0_u64, |acc, value| acc.saturating_add(*value));
    let count = u64::try_from(latencies.len()).unwrap_or(u64::MAX);
    LatencySummary {
        average_ms: ratio(sum, count),
        p50_ms: percentile(latencies, 50),
        p95_ms: percentile(latencies, 95),
        p99_ms: percentile(latencies, 99),
    }
}

/// Nearest-rank percentile over sorted, non-empty values.
fn percentile(sorted: &[u64], pct: usize) -> u64 {
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted.get(rank - 1).copied().unwrap_or_default()
}
