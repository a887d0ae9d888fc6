//! Authentication modes accepted by the Drip API.
//!
//! # Design
//! Drip accepts either an API key sent as HTTP basic auth (key as username,
//! empty password) or an OAuth bearer token. `Auth` carries exactly one of the
//! two and renders its own `authorization` header, so request construction
//! never has to branch on the mode.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// The credential a client authenticates with.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic auth with the API key as username and an empty password.
    Basic { api_key: String },
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
}

impl Auth {
    /// Short name of the scheme, safe to log.
    pub fn scheme(&self) -> &'static str {
        match self {
            Auth::Basic { .. } => "basic",
            Auth::Bearer { .. } => "bearer",
        }
    }

    /// Value of the `authorization` header for this credential.
    pub fn header_value(&self) -> String {
        match self {
            Auth::Basic { api_key } => {
                format!("Basic {}", STANDARD.encode(format!("{api_key}:")))
            }
            Auth::Bearer { token } => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { .. } => f.debug_struct("Basic").field("api_key", &"<redacted>").finish(),
            Auth::Bearer { .. } => f.debug_struct("Bearer").field("token", &"<redacted>").finish(),
        }
    }
}
