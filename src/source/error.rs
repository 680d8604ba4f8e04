//! Error types for the data source.

use thiserror::Error;

/// Failure to obtain a snapshot (or to act on an order) from the backend.
///
/// Always transient from the board's point of view: the pass is skipped and
/// retried on the next poll or stream event.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend did not answer in time.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The payload was not a valid collection document.
    #[error("Invalid payload: {0}")]
    Decode(String),

    /// The server cancelled the stream (e.g. security rules changed).
    #[error("Stream cancelled: {0}")]
    Cancelled(String),

    /// The auth token expired or was revoked mid-stream.
    #[error("Stream credential revoked")]
    AuthRevoked,

    /// The feed or subscription has ended.
    #[error("Source closed")]
    Closed,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // Request URLs carry the auth token.
        let e = e.without_url();
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Decode(e.to_string())
    }
}
