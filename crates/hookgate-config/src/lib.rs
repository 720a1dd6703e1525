// crates/hookgate-config/src/lib.rs
// ============================================================================
// Module: Hookgate Config Library
// Description: Configuration model and loaders for the hookgate service.
// Purpose: Provide one strict, validated source of runtime settings.
// Dependencies: hookgate-core, hookgate-delivery, hookgate-failover, toml
// ============================================================================

//! ## Overview
//! [`HookgateConfig::load`] reads a TOML file under size and path limits and
//! validates it before returning. Builders convert validated sections into
//! the core runtime types; credentials referenced by environment variable
//! are resolved only at build time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod secrets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::AUTOMATION_DESTINATION_ID;
pub use config::AutomationConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::CircuitSettings;
pub use config::ConfigError;
pub use config::DeliverySettings;
pub use config::DestinationConfig;
pub use config::FailoverConfig;
pub use config::HookgateConfig;
pub use config::ObservabilityConfig;
pub use config::ServerConfig;
pub use config::SignatureConfig;
pub use secrets::AuthConfig;
pub use secrets::SecretRef;
pub use secrets::env_lookup;
