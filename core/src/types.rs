//! Response types returned by `DripClient`.
//!
//! # Design
//! Drip responses are JSON:API documents whose shape varies per endpoint, and
//! this crate deliberately does not model them. Callers get the status code and
//! the decoded `serde_json::Value` and interpret both themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Status code and decoded JSON body of a GET or POST call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Decode a raw response. An empty body (e.g. `204 No Content`) becomes
    /// `Value::Null`.
    pub fn from_http(response: HttpResponse) -> Result<Self, ApiError> {
        let status = response.status;
        let body = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body)
                .map_err(|source| ApiError::Deserialization { status, source })?
        };
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Split into the `(status, body)` pair.
    pub fn into_parts(self) -> (u16, Value) {
        (self.status, self.body)
    }
}
