//! Transport error types

use thiserror::Error;

/// Errors that can occur when talking to the store
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("InfluxDB unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Statement rejected: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

impl TransportError {
    /// Classify a reqwest failure the same way for every endpoint
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Unavailable
        } else {
            TransportError::Request(err)
        }
    }
}
