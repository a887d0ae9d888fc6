//! Error types for the Drip API client.
//!
//! # Design
//! Construction and runtime failures are kept apart. `ConfigError` can only
//! come out of building a `ClientConfig`, so a `DripClient` that exists is
//! always fully configured. `ApiError` covers what can go wrong while a call
//! is in flight. HTTP status codes are not errors at all: 4xx/5xx responses
//! are handed back to the caller as data.

use thiserror::Error;

/// Errors raised while building a `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No account id was supplied, or it was empty.
    #[error("missing account id: please provide an account id")]
    MissingAccountId,

    /// Neither an API key nor a bearer token was supplied.
    #[error("missing credential: please provide an API key or a bearer token")]
    MissingCredential,
}

/// Errors returned by `DripClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body was not valid JSON.
    #[error("deserialization failed (HTTP {status}): {source}")]
    Deserialization {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Wrap any transport-level failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ApiError::Transport(err.into())
    }
}
