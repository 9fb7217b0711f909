//! Error types for the smoke-test harness
//!
//! Only transport and configuration problems travel as `Error`. A step that
//! gets an unexpected status or a `success: false` body is not an error; it
//! is recorded as a failed outcome in the run report.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("Invalid base URL '{0}'. Expected something like http://localhost:8080")]
    InvalidBaseUrl(String),

    // === Response Errors ===
    #[error("Unexpected response from {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a connection failure error
    pub fn connection_failed(url: &str, reason: impl ToString) -> Self {
        Self::ConnectionFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(url: &str, secs: u64) -> Self {
        Self::Timeout {
            url: url.to_string(),
            secs,
        }
    }

    /// Create an unexpected response error (a payload field was missing)
    pub fn unexpected_response(path: &str, reason: &str) -> Self {
        Self::UnexpectedResponse {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the network rather than from local setup
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::ConnectionFailed { .. } | Error::Timeout { .. }
        )
    }
}
