// crates/hookgate-server/src/error.rs
// ============================================================================
// Module: Server Errors
// Description: Startup and transport failures of the HTTP service.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ServerError`] covers failures assembling the runtime from config and
//! failures of the listener once serving.

/// Hookgate server errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be turned into a runtime.
    #[error("config error: {0}")]
    Config(String),
    /// Runtime components failed to initialize.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or HTTP server failure.
    #[error("transport error: {0}")]
    Transport(String),
}
