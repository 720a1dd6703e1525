// crates/hookgate-core/src/runtime/signature.rs
// ============================================================================
// Module: Hookgate Signature Verification
// Description: HMAC-SHA256 signing and constant-time verification for inbound webhooks.
// Purpose: Authenticate raw request bytes before any business logic executes.
// Dependencies: hmac, sha2, hex, subtle
// ============================================================================

//! ## Overview
//! The canonical signature is `sha256=<lowercase hex HMAC-SHA256(secret, body)>`
//! computed over the exact bytes received.
//! Invariants:
//! - Verification fails closed: a missing header or missing secret rejects.
//! - Digest comparison is constant time.
//! - Every rejection surfaces the same [`WebhookError::Auth`].
//!
//! Security posture: secrets are held behind [`Arc`] and replaced whole on
//! rotation; they never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::error::WebhookError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of the canonical signature value.
pub const SIGNATURE_PREFIX: &str = "sha256=";
/// Default inbound signature header name (lowercase).
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// HMAC-SHA256 instance.
type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Secret Material
// ============================================================================

/// Shared secret used for signing and verification.
///
/// # Invariants
/// - Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wraps secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Validation`] when the secret is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, WebhookError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(WebhookError::Validation("signing secret must be non-empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// Rotatable holder for the active signing secret.
#[derive(Debug, Default)]
pub struct SecretSlot {
    /// Current secret; `None` means verification rejects everything.
    current: RwLock<Option<Arc<SigningSecret>>>,
}

impl SecretSlot {
    /// Creates a slot holding `secret`.
    #[must_use]
    pub fn new(secret: Option<SigningSecret>) -> Self {
        Self {
            current: RwLock::new(secret.map(Arc::new)),
        }
    }

    /// Returns the secret in effect.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SigningSecret>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the secret whole.
    pub fn rotate(&self, secret: SigningSecret) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(secret));
    }

    /// Removes the secret so every verification fails.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ============================================================================
// SECTION: Sign / Verify
// ============================================================================

/// Computes the raw HMAC-SHA256 digest.
fn digest(payload: &[u8], secret: &SigningSecret) -> Result<Vec<u8>, WebhookError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|err| WebhookError::Internal(format!("hmac key rejected: {err}")))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Returns the canonical signature header value for `payload`.
///
/// # Errors
///
/// Returns [`WebhookError::Internal`] if the MAC cannot be keyed.
pub fn sign(payload: &[u8], secret: &SigningSecret) -> Result<String, WebhookError> {
    Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(digest(payload, secret)?)))
}

/// Verifies a presented signature against `payload`.
///
/// Returns false when the header or secret is missing, the header is not a
/// `sha256=` hex digest, or the digest does not match.
#[must_use]
pub fn verify(payload: &[u8], presented: Option<&str>, secret: Option<&SigningSecret>) -> bool {
    let (Some(presented), Some(secret)) = (presented, secret) else {
        return false;
    };
    let Some(encoded) = presented.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(candidate) = hex::decode(encoded) else {
        return false;
    };
    let Ok(expected) = digest(payload, secret) else {
        return false;
    };
    constant_time_eq(&expected, &candidate)
}

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Request-path verifier bound to a rotatable secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    /// Secret source.
    slot: Arc<SecretSlot>,
}

impl SignatureVerifier {
    /// Creates a verifier reading from `slot`.
    #[must_use]
    pub const fn new(slot: Arc<SecretSlot>) -> Self {
        Self {
            slot,
        }
    }

    /// Returns the underlying secret slot.
    #[must_use]
    pub fn slot(&self) -> &Arc<SecretSlot> {
        &self.slot
    }

    /// Verifies an inbound request.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Auth`] on any verification failure.
    pub fn verify_request(&self, payload: &[u8], header: Option<&str>) -> Result<(), WebhookError> {
        let secret = self.slot.current();
        if verify(payload, header, secret.as_deref()) { Ok(()) } else { Err(WebhookError::Auth) }
    }
}
