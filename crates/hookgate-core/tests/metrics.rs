// crates/hookgate-core/tests/metrics.rs
// ============================================================================
// Module: Delivery Metrics Tests
// Description: Rolling window bounds, rates, percentiles, and breakdowns.
// ============================================================================
//! ## Overview
//! Feeds synthetic attempts into the window and checks aggregates.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::time::Duration;
use std::time::Instant;

use hookgate_core::DeliveryAttempt;
use hookgate_core::DeliveryMetrics;
use hookgate_core::DestinationId;
use hookgate_core::ErrorKind;
use hookgate_core::EventType;
use hookgate_core::MetricsConfig;
use hookgate_core::WebhookError;

/// Successful attempt against `destination`.
fn ok(destination: &str, event: &str, latency_ms: u64) -> DeliveryAttempt {
    DeliveryAttempt::success(
        0,
        DestinationId::new(destination),
        Some(EventType::new(event)),
        1,
        200,
        latency_ms,
    )
}

/// Failed attempt against `destination`.
fn failed(destination: &str, error: &WebhookError, attempt: u32) -> DeliveryAttempt {
    DeliveryAttempt::failure(0, DestinationId::new(destination), None, attempt, error, 5)
}

#[test]
fn empty_window_reports_zeroes() {
    let metrics = DeliveryMetrics::new(MetricsConfig::default());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_attempts, 0);
    assert!(snapshot.success_rate.abs() < f64::EPSILON);
    assert_eq!(snapshot.latency.p99_ms, 0);
    assert!(snapshot.recent_errors.is_empty());
}

#[test]
fn rates_and_percentiles_use_nearest_rank() {
    let metrics = DeliveryMetrics::new(MetricsConfig::default());
    let now = Instant::now();
    for latency in 1..=100 {
        metrics.record_at(ok("sentry", "bug.created", latency), now);
    }
    let snapshot = metrics.snapshot_at(now);
    assert_eq!(snapshot.total_attempts, 100);
    assert!((snapshot.success_rate - 1.0).abs() < f64::EPSILON);
    assert!((snapshot.latency.average_ms - 50.5).abs() < 1e-9);
    assert_eq!(snapshot.latency.p50_ms, 50);
    assert_eq!(snapshot.latency.p95_ms, 95);
    assert_eq!(snapshot.latency.p99_ms, 99);
}

#[test]
fn breakdowns_split_by_destination_and_event_type() {
    let metrics = DeliveryMetrics::new(MetricsConfig::default());
    let now = Instant::now();
    metrics.record_at(ok("slack", "bug.created", 10), now);
    metrics.record_at(ok("slack", "bug.resolved", 30), now);
    metrics.record_at(failed("datadog", &WebhookError::http(503), 1), now);
    let snapshot = metrics.snapshot_at(now);

    let slack = &snapshot.by_destination["slack"];
    assert_eq!(slack.attempts, 2);
    assert_eq!(slack.failures, 0);
    assert!((slack.average_latency_ms - 20.0).abs() < 1e-9);
    assert_eq!(snapshot.by_destination["datadog"].failures, 1);
    assert_eq!(snapshot.by_event_type["bug.created"].attempts, 1);
    assert_eq!(snapshot.by_event_type["unspecified"].failures, 1);
    assert!((snapshot.error_rate - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn count_bound_evicts_oldest_first() {
    let metrics = DeliveryMetrics::new(MetricsConfig {
        max_attempts: 3,
        ..MetricsConfig::default()
    });
    let now = Instant::now();
    for latency in 1..=5 {
        metrics.record_at(ok("generic", "bug.created", latency), now);
    }
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics.snapshot_at(now).latency.p50_ms, 4);
}

#[test]
fn age_bound_evicts_stale_attempts() {
    let metrics = DeliveryMetrics::new(MetricsConfig {
        max_age: Duration::from_secs(60),
        ..MetricsConfig::default()
    });
    let start = Instant::now();
    metrics.record_at(ok("generic", "bug.created", 1), start);
    metrics.record_at(ok("generic", "bug.created", 2), start + Duration::from_secs(30));
    let snapshot = metrics.snapshot_at(start + Duration::from_secs(61));
    assert_eq!(snapshot.total_attempts, 1);
    assert_eq!(snapshot.latency.p50_ms, 2);
}

#[test]
fn recent_errors_are_newest_first_and_bounded() {
    let metrics = DeliveryMetrics::new(MetricsConfig {
        recent_errors: 2,
        ..MetricsConfig::default()
    });
    let now = Instant::now();
    for attempt in 1..=3 {
        metrics.record_at(failed("generic", &WebhookError::Network("reset".into()), attempt), now);
    }
    metrics.record_at(ok("generic", "bug.created", 1), now);
    let errors = metrics.snapshot_at(now).recent_errors;
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].attempt, 3);
    assert_eq!(errors[1].attempt, 2);
    assert_eq!(errors[0].error_kind, Some(ErrorKind::Network));
    assert!(errors[0].retryable);
}
