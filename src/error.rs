//! Error types for relay operations

use thiserror::Error;

/// Errors that can occur while relaying an event
#[derive(Error, Debug)]
pub enum RelayError {
    /// Webhook URL missing or unusable; raised before any enrichment or
    /// network work
    #[error("configuration error: {0}")]
    Config(String),

    /// Webhook URL did not parse as an absolute URL
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure on the delivery attempt
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered outside the 2xx range
    #[error("webhook delivery failed: HTTP {status}")]
    DeliveryFailed {
        status: u16,
        /// Response body, truncated for diagnostics
        body: String,
    },

    /// Payload serialization failed
    #[error("payload error: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Payload(err.to_string())
    }
}
