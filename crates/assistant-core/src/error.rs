//! Error types for backend requests
//!
//! Every variant renders as the text shown to the user in the conversation,
//! so `to_string()` is what ends up in the assistant message.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response
    #[error("Error: {0}")]
    Transport(String),

    /// Non-success status; use [`BackendError::status`] to build one
    #[error("Error: {message}")]
    Status { status: u16, message: String },

    /// No response within the configured timeout
    #[error("Error: request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The response body was not in the expected shape
    #[error("Error: unexpected response from backend: {0}")]
    Decode(String),
}

impl BackendError {
    /// `detail` is the body's `detail`/`error` field, when present.
    pub fn status(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("request failed with status {status}"));
        BackendError::Status { status, message }
    }

    /// Classify a client error; `timeout` is the limit the client was built with.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}
