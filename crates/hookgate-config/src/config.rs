// crates/hookgate-config/src/config.rs
// ============================================================================
// Module: Hookgate Configuration
// Description: Configuration loading and validation for the hookgate service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: hookgate-core, hookgate-delivery, hookgate-failover, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed.
//! Invariants:
//! - [`HookgateConfig::load`] never returns an unvalidated config.
//! - Timeouts, thresholds, and window sizes are bounded.
//! - Destination and receiver ids are unique.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hookgate_core::AuditSink;
use hookgate_core::CircuitConfig;
use hookgate_core::Destination;
use hookgate_core::EventFilters;
use hookgate_core::EventType;
use hookgate_core::FileAuditSink;
use hookgate_core::MetricsConfig;
use hookgate_core::NoopAuditSink;
use hookgate_core::RetryPolicy;
use hookgate_core::SigningSecret;
use hookgate_core::SinkShape;
use hookgate_core::StderrAuditSink;
use hookgate_delivery::CHAT_MESSAGE_EVENT;
use hookgate_delivery::DeliveryConfig;
use hookgate_failover::FailbackPolicy;
use hookgate_failover::HealthThresholds;
use hookgate_failover::Receiver;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::secrets::AuthConfig;
use crate::secrets::SecretRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "hookgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "HOOKGATE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum inbound request body size in bytes.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Maximum number of destinations.
const MAX_DESTINATIONS: usize = 256;
/// Maximum number of failover receivers.
const MAX_RECEIVERS: usize = 16;
/// Longest accepted timeout, cooldown, or probe interval in milliseconds.
const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1_000;
/// Shortest accepted send deadline in milliseconds.
const MIN_TIMEOUT_MS: u64 = 10;
/// Largest accepted jitter in milliseconds.
const MAX_JITTER_MS: u64 = 10_000;
/// Largest accepted metrics window.
const MAX_WINDOW_SIZE: usize = 1_000_000;
/// Destination id reserved for the automation backend.
pub const AUTOMATION_DESTINATION_ID: &str = "automation";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Hookgate service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookgateConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Outbound delivery deadlines.
    #[serde(default)]
    pub delivery: DeliverySettings,
    /// Circuit breaker thresholds.
    #[serde(default)]
    pub circuit: CircuitSettings,
    /// Delivery metrics window.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Inbound webhook signature settings.
    #[serde(default)]
    pub signature: SignatureConfig,
    /// Redundant receiver failover.
    #[serde(default)]
    pub failover: Option<FailoverConfig>,
    /// Automation backend for chat relays.
    #[serde(default)]
    pub automation: Option<AutomationConfig>,
    /// Outbound event destinations.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl HookgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.delivery.validate()?;
        self.circuit.validate()?;
        self.observability.validate()?;
        self.audit.validate()?;
        self.signature.validate()?;
        if let Some(failover) = &self.failover {
            failover.validate()?;
        }
        if let Some(automation) = &self.automation {
            automation.validate()?;
        }
        if self.destinations.len() > MAX_DESTINATIONS {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_DESTINATIONS} destinations are allowed"
            )));
        }
        let mut seen = HashSet::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            destination.validate()?;
            if !seen.insert(destination.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate destination id {}",
                    destination.id
                )));
            }
        }
        Ok(())
    }

    /// Builds the destination list, resolving credentials through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a referenced secret is unset.
    pub fn destinations(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Vec<Destination>, ConfigError> {
        self.destinations.iter().map(|destination| destination.build(lookup)).collect()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum inbound request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Bearer token guarding admin endpoints.
    #[serde(default)]
    pub admin_token: Option<SecretRef>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            admin_token: None,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Resolves the admin token, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the referenced token is unset.
    pub fn admin_token(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ConfigError> {
        self.admin_token
            .as_ref()
            .map(|token| token.resolve("server.admin_token", lookup))
            .transpose()
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES}"
            )));
        }
        if let Some(token) = &self.admin_token {
            token.validate("server.admin_token")?;
        } else if !addr.ip().is_loopback() {
            return Err(ConfigError::Invalid(
                "non-loopback bind requires server.admin_token".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Delivery
// ============================================================================

/// Outbound delivery deadlines and limits.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySettings {
    /// Deadline for a whole send in milliseconds.
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    /// Deadline for one attempt in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Maximum jitter added to backoff in milliseconds.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Response body cap in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            overall_timeout_ms: default_overall_timeout_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl DeliverySettings {
    /// Returns the delivery client deadlines.
    #[must_use]
    pub const fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            overall_timeout: Duration::from_millis(self.overall_timeout_ms),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validates delivery settings.
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "delivery.overall_timeout_ms",
            self.overall_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )?;
        check_range(
            "delivery.attempt_timeout_ms",
            self.attempt_timeout_ms,
            MIN_TIMEOUT_MS,
            self.overall_timeout_ms,
        )?;
        check_range("delivery.max_jitter_ms", self.max_jitter_ms, 0, MAX_JITTER_MS)?;
        check_range(
            "delivery.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )?;
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "delivery.max_response_bytes must be between 1 and {MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitSettings {
    /// Consecutive terminal failures that open a circuit.
    #[serde(default = "default_circuit_failure_threshold")]
    pub failure_threshold: u32,
    /// Open duration before a trial request, in milliseconds.
    #[serde(default = "default_circuit_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_circuit_failure_threshold(),
            cooldown_ms: default_circuit_cooldown_ms(),
        }
    }
}

impl CircuitSettings {
    /// Returns the breaker configuration.
    #[must_use]
    pub const fn circuit_config(&self) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }

    /// Validates circuit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("circuit.failure_threshold", u64::from(self.failure_threshold), 1, 1_000)?;
        check_range("circuit.cooldown_ms", self.cooldown_ms, 1, MAX_TIMEOUT_MS)
    }
}

/// Rolling metrics window.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Maximum attempts retained.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Maximum attempt age in seconds.
    #[serde(default = "default_window_age_secs")]
    pub window_age_secs: u64,
    /// Recent errors included in snapshots.
    #[serde(default = "default_recent_errors")]
    pub recent_errors: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            window_age_secs: default_window_age_secs(),
            recent_errors: default_recent_errors(),
        }
    }
}

impl ObservabilityConfig {
    /// Returns the metrics window configuration.
    #[must_use]
    pub const fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            max_attempts: self.window_size,
            max_age: Duration::from_secs(self.window_age_secs),
            recent_errors: self.recent_errors,
        }
    }

    /// Validates the window bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::Invalid(format!(
                "observability.window_size must be between 1 and {MAX_WINDOW_SIZE}"
            )));
        }
        if self.recent_errors > self.window_size {
            return Err(ConfigError::Invalid(
                "observability.recent_errors exceeds window_size".to_string(),
            ));
        }
        check_range("observability.window_age_secs", self.window_age_secs, 1, 7 * 24 * 3_600)
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Opens the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::File, Some(path)) => FileAuditSink::new(Path::new(path.trim()))
                .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
                .map_err(|err| ConfigError::Io(format!("audit log: {err}"))),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
        }
    }

    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Signature
// ============================================================================

/// Inbound webhook signature configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureConfig {
    /// Shared HMAC secret; unset rejects every signed request.
    #[serde(default)]
    pub secret: Option<SecretRef>,
}

impl SignatureConfig {
    /// Resolves the signing secret, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the referenced secret is unset.
    pub fn signing_secret(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<SigningSecret>, ConfigError> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };
        let value = secret.resolve("signature.secret", lookup)?;
        SigningSecret::new(value.into_bytes())
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("signature.secret: {err}")))
    }

    /// Validates signature configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.secret.as_ref().map_or(Ok(()), |secret| secret.validate("signature.secret"))
    }
}

// ============================================================================
// SECTION: Failover
// ============================================================================

/// Redundant receiver failover configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FailoverConfig {
    /// Receivers; the first is the primary.
    pub receivers: Vec<Receiver>,
    /// Consecutive failed probes that mark a receiver unhealthy.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Consecutive passed probes per recovery step.
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
    /// Probe interval in milliseconds.
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Failback policy.
    #[serde(default)]
    pub failback: FailbackPolicy,
}

impl FailoverConfig {
    /// Returns the health thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            failure_threshold: self.failure_threshold,
            recovery_threshold: self.recovery_threshold,
        }
    }

    /// Returns the probe interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns the per-probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Validates failover configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.receivers.is_empty() || self.receivers.len() > MAX_RECEIVERS {
            return Err(ConfigError::Invalid(format!(
                "failover.receivers must list between 1 and {MAX_RECEIVERS} receivers"
            )));
        }
        let mut seen = HashSet::with_capacity(self.receivers.len());
        for receiver in &self.receivers {
            if receiver.id.as_str().trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "failover receiver id must be non-empty".to_string(),
                ));
            }
            if !seen.insert(&receiver.id) {
                return Err(ConfigError::Invalid(format!("duplicate receiver id {}", receiver.id)));
            }
            validate_url(&format!("failover.receivers.{}.url", receiver.id), &receiver.url)?;
            validate_url(
                &format!("failover.receivers.{}.health_url", receiver.id),
                &receiver.health_url,
            )?;
        }
        check_range("failover.failure_threshold", u64::from(self.failure_threshold), 1, 100)?;
        check_range("failover.recovery_threshold", u64::from(self.recovery_threshold), 1, 100)?;
        check_range("failover.interval_ms", self.interval_ms, 100, MAX_TIMEOUT_MS)?;
        check_range(
            "failover.probe_timeout_ms",
            self.probe_timeout_ms,
            MIN_TIMEOUT_MS,
            self.interval_ms,
        )
    }
}

// ============================================================================
// SECTION: Automation Backend
// ============================================================================

/// Automation backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AutomationConfig {
    /// Backend webhook URL.
    pub url: String,
    /// Backend authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Retry policy for chat relays.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AutomationConfig {
    /// Builds the backend destination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a referenced secret is unset.
    pub fn destination(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Destination, ConfigError> {
        let mut destination = self.unauthenticated();
        destination.auth = self.auth.resolve("automation.auth", lookup)?;
        Ok(destination)
    }

    /// Backend destination without credentials.
    fn unauthenticated(&self) -> Destination {
        let mut destination = Destination::new(AUTOMATION_DESTINATION_ID, self.url.trim());
        destination.events = vec![EventType::new(CHAT_MESSAGE_EVENT)];
        destination.retry = self.retry.clone();
        destination
    }

    /// Validates the backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("automation.url", &self.url)?;
        self.auth.validate("automation.auth")?;
        self.unauthenticated()
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("automation: {err}")))
    }
}

// ============================================================================
// SECTION: Destinations
// ============================================================================

/// One outbound destination as written in config.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    /// Destination identifier.
    pub id: String,
    /// Target URL.
    pub url: String,
    /// Payload shape.
    #[serde(default)]
    pub shape: SinkShape,
    /// Subscribed event types (`*` for all).
    pub events: Vec<EventType>,
    /// Attribute filters.
    #[serde(default)]
    pub filters: EventFilters,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Whether the destination receives events.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl DestinationConfig {
    /// Builds the runtime destination, resolving credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the destination is invalid or a
    /// referenced secret is unset.
    pub fn build(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Destination, ConfigError> {
        self.validate()?;
        let mut destination = self.unauthenticated();
        destination.auth = self.auth.resolve(&format!("destinations.{}.auth", self.id), lookup)?;
        Ok(destination)
    }

    /// Runtime destination without credentials.
    fn unauthenticated(&self) -> Destination {
        let mut destination = Destination::new(self.id.trim(), self.url.trim());
        destination.shape = self.shape;
        destination.events.clone_from(&self.events);
        destination.filters = self.filters.clone();
        destination.retry = self.retry.clone();
        destination.active = self.active;
        destination
    }

    /// Validates the destination.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim() == AUTOMATION_DESTINATION_ID {
            return Err(ConfigError::Invalid(format!(
                "destination id {AUTOMATION_DESTINATION_ID} is reserved for the automation backend"
            )));
        }
        validate_url(&format!("destinations.{}.url", self.id), &self.url)?;
        self.auth.validate(&format!("destinations.{}.auth", self.id))?;
        self.unauthenticated()
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Requires an absolute http(s) URL with a host.
fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must be an http(s) url with a host")));
    }
    Ok(())
}

/// Checks `min <= value <= max`.
fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Default listen address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default maximum request body size in bytes.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default send deadline.
const fn default_overall_timeout_ms() -> u64 {
    15_000
}

/// Default attempt deadline.
const fn default_attempt_timeout_ms() -> u64 {
    10_000
}

/// Default backoff jitter bound.
const fn default_max_jitter_ms() -> u64 {
    250
}

/// Default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Default response body cap.
const fn default_max_response_bytes() -> usize {
    1024 * 1024
}

/// Default circuit failure threshold.
const fn default_circuit_failure_threshold() -> u32 {
    5
}

/// Default circuit cooldown.
const fn default_circuit_cooldown_ms() -> u64 {
    30_000
}

/// Default metrics window size.
const fn default_window_size() -> usize {
    1_000
}

/// Default metrics window age.
const fn default_window_age_secs() -> u64 {
    3_600
}

/// Default recent error count.
const fn default_recent_errors() -> usize {
    20
}

/// Default receiver failure threshold.
const fn default_failure_threshold() -> u32 {
    3
}

/// Default receiver recovery threshold.
const fn default_recovery_threshold() -> u32 {
    2
}

/// Default probe interval.
const fn default_probe_interval_ms() -> u64 {
    30_000
}

/// Default probe timeout.
const fn default_probe_timeout_ms() -> u64 {
    5_000
}

/// Destinations are active unless disabled.
const fn default_active() -> bool {
    true
}
