//! Uniform failure type for every REST call.
//!
//! Transport failures use status 0 so callers can branch on `status` alone.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde::Deserialize;

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response from server";
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const ENCODE_ERROR_CODE: &str = "ENCODE_ERROR";
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";
pub const UNEXPECTED_RESPONSE_CODE: &str = "UNEXPECTED_RESPONSE";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, or 0 when no response was received.
    pub status: u16,
    pub message: String,
    /// Machine-readable code from the server's error body, if any.
    pub code: Option<String>,
}

/// Error body shape the server uses for non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        Self { status, message: message.into(), code }
    }

    /// Successful status with a body that is not valid JSON.
    #[must_use]
    pub fn invalid_json() -> Self {
        Self::new(500, INVALID_JSON_MESSAGE, None)
    }

    /// Successful status with valid JSON that does not match the expected type.
    #[must_use]
    pub fn unexpected_shape(err: &serde_json::Error) -> Self {
        Self::new(
            500,
            format!("Unexpected response from server: {err}"),
            Some(UNEXPECTED_RESPONSE_CODE.to_owned()),
        )
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, message, Some(NETWORK_ERROR_CODE.to_owned()))
    }

    #[must_use]
    pub fn encode(err: &serde_json::Error) -> Self {
        Self::new(
            0,
            format!("request body encode failed: {err}"),
            Some(ENCODE_ERROR_CODE.to_owned()),
        )
    }

    /// Rejected locally before any request was sent.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(422, message, Some(VALIDATION_ERROR_CODE.to_owned()))
    }

    /// Build the error for a non-2xx response from its status and raw body.
    ///
    /// Uses the body's `error`/`code` fields when the body is JSON, otherwise
    /// falls back to `HTTP <status>: <reason>`. An empty `error` counts as
    /// missing.
    #[must_use]
    pub fn from_response(status: u16, reason: &str, body: &str) -> Self {
        let fallback = format!("HTTP {status}: {reason}");
        let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
        let message = parsed.error.filter(|m| !m.is_empty()).unwrap_or(fallback);
        Self { status, message, code: parsed.code }
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        self.status == 0 && self.code.as_deref() == Some(NETWORK_ERROR_CODE)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Whether a caller could reasonably retry. Nothing in this crate does.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_network() || matches!(self.status, 429 | 500..=599)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}
