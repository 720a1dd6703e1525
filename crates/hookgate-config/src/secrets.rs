// crates/hookgate-config/src/secrets.rs
// ============================================================================
// Module: Config Secrets
// Description: Inline or environment-referenced credentials.
// Purpose: Keep secrets out of config files while failing closed when unset.
// Dependencies: hookgate-core, serde
// ============================================================================

//! ## Overview
//! A [`SecretRef`] names exactly one source: an inline value or an
//! environment variable. Resolution goes through a lookup function so
//! callers choose the environment; [`env_lookup`] reads the process one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;

use hookgate_core::AuthDescriptor;
use serde::Deserialize;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Secret References
// ============================================================================

/// Credential given inline or by environment variable name.
#[derive(Clone, Default, Deserialize)]
pub struct SecretRef {
    /// Inline value.
    #[serde(default)]
    pub value: Option<String>,
    /// Environment variable holding the value.
    #[serde(default)]
    pub env: Option<String>,
}

impl std::fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRef")
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .field("env", &self.env)
            .finish()
    }
}

impl SecretRef {
    /// Inline secret.
    #[must_use]
    pub fn inline(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            env: None,
        }
    }

    /// Environment-referenced secret.
    #[must_use]
    pub fn from_env(name: impl Into<String>) -> Self {
        Self {
            value: None,
            env: Some(name.into()),
        }
    }

    /// Returns true when no source is set.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.value.is_none() && self.env.is_none()
    }

    /// Checks that exactly one non-empty source is named.
    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match (&self.value, &self.env) {
            (Some(_), Some(_)) => {
                Err(ConfigError::Invalid(format!("{field} sets both value and env")))
            }
            (None, None) => Err(ConfigError::Invalid(format!("{field} requires value or env"))),
            (Some(value), None) if value.is_empty() => {
                Err(ConfigError::Invalid(format!("{field} must be non-empty")))
            }
            (None, Some(name)) if name.trim().is_empty() => {
                Err(ConfigError::Invalid(format!("{field}.env must be non-empty")))
            }
            _ => Ok(()),
        }
    }

    /// Resolves the secret through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the source is missing or empty.
    pub fn resolve(
        &self,
        field: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        self.validate(field)?;
        let resolved = match (&self.value, &self.env) {
            (Some(value), _) => Some(value.clone()),
            (None, Some(name)) => lookup(name.trim()),
            (None, None) => None,
        };
        match resolved {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConfigError::Invalid(format!("{field} is not set in the environment"))),
        }
    }
}

/// Reads a variable from the process environment.
#[must_use]
pub fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

// ============================================================================
// SECTION: Destination Auth
// ============================================================================

/// Destination authentication as written in config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// Bearer token.
    Bearer {
        /// Token source.
        token: SecretRef,
    },
    /// HTTP basic auth.
    Basic {
        /// Username.
        username: String,
        /// Password source.
        password: SecretRef,
    },
    /// API key in a custom header.
    ApiKey {
        /// Header name.
        header: String,
        /// Key source.
        value: SecretRef,
    },
}

impl AuthConfig {
    /// Validates structure without resolving secrets.
    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::None => Ok(()),
            Self::Bearer {
                token,
            } => token.validate(&format!("{field}.token")),
            Self::Basic {
                username,
                password,
            } => {
                if username.is_empty() || username.contains(':') {
                    return Err(ConfigError::Invalid(format!(
                        "{field}.username must be non-empty without ':'"
                    )));
                }
                password.validate(&format!("{field}.password"))
            }
            Self::ApiKey {
                header,
                value,
            } => {
                if header.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!("{field}.header must be non-empty")));
                }
                value.validate(&format!("{field}.value"))
            }
        }
    }

    /// Resolves secrets into an [`AuthDescriptor`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a referenced secret is unset.
    pub fn resolve(
        &self,
        field: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<AuthDescriptor, ConfigError> {
        Ok(match self {
            Self::None => AuthDescriptor::None,
            Self::Bearer {
                token,
            } => AuthDescriptor::Bearer {
                token: token.resolve(&format!("{field}.token"), lookup)?,
            },
            Self::Basic {
                username,
                password,
            } => AuthDescriptor::Basic {
                username: username.clone(),
                password: password.resolve(&format!("{field}.password"), lookup)?,
            },
            Self::ApiKey {
                header,
                value,
            } => AuthDescriptor::ApiKey {
                header: header.trim().to_string(),
                value: value.resolve(&format!("{field}.value"), lookup)?,
            },
        })
    }
}
