// crates/hookgate-delivery/src/auth.rs
// ============================================================================
// Module: Destination Authentication
// Description: Header construction for per-destination credentials.
// Purpose: Attach auth headers before a request reaches the delivery client.
// Dependencies: base64, hookgate-core
// ============================================================================

//! ## Overview
//! Converts an [`AuthDescriptor`] into request headers. Credentials were
//! validated when the destination was accepted into the set.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hookgate_core::AuthDescriptor;

/// `Authorization` header name.
const AUTHORIZATION: &str = "authorization";

/// Returns the headers that authenticate a request for `auth`.
#[must_use]
pub fn auth_headers(auth: &AuthDescriptor) -> Vec<(String, String)> {
    match auth {
        AuthDescriptor::None => Vec::new(),
        AuthDescriptor::Bearer {
            token,
        } => vec![(AUTHORIZATION.to_string(), format!("Bearer {token}"))],
        AuthDescriptor::Basic {
            username,
            password,
        } => {
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            vec![(AUTHORIZATION.to_string(), format!("Basic {encoded}"))]
        }
        AuthDescriptor::ApiKey {
            header,
            value,
        } => vec![(header.to_ascii_lowercase(), value.clone())],
    }
}
