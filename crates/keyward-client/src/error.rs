//! Error types for the Keyward client.

use keyward_core::ModelError;

/// All errors that can occur when talking to the dashboard API.
#[derive(Debug, thiserror::Error)]
pub enum KeywardError {
    /// Missing required configuration.
    #[error("keyward config error: {0}")]
    Config(String),

    /// A request body failed local validation before being sent.
    #[error("invalid request: {0}")]
    Invalid(#[from] ModelError),

    /// API returned an HTTP error.
    #[error("keyward API error {status_code}: {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the API.
        message: String,
    },

    /// Authentication failed (401/403).
    #[error("keyward auth error: {0}")]
    Auth(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request timed out.
    #[error("keyward request timed out")]
    Timeout,

    /// Network or HTTP client error.
    #[error("keyward network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("keyward json error: {0}")]
    Json(#[from] serde_json::Error),
}
