// crates/hookgate-core/src/core/time.rs
// ============================================================================
// Module: Hookgate Time Helpers
// Description: Wall-clock timestamps for records and audit events.
// Purpose: Provide a single millisecond timestamp source.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Wall-clock timestamps are used only for reporting. State machines take
//! monotonic [`std::time::Instant`] values from their callers instead.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
///
/// Clocks set before the epoch report zero; values beyond `u64` saturate.
#[must_use]
pub fn now_ms() -> u64 {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
