//! Typed failures surfaced by the API core.

use thiserror::Error;

/// Every failure the core can surface to a caller.
///
/// `Clone` because the index loader broadcasts a single load outcome to every
/// caller that joined the in-flight attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request did not complete within its deadline.
    #[error("request timed out")]
    Timeout,

    /// The request failed in transit, completed with a non-success status, or
    /// every relay endpoint was exhausted (carries the last failure).
    #[error("network error: {message}")]
    Network {
        /// HTTP status of the failing response, when one was received.
        status: Option<u16>,
        message: String,
    },

    /// Profile lookup returned HTTP 404: no account with that id.
    #[error("player not found")]
    PlayerNotFound,

    /// The response body could not be parsed as the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn from_status(status: u16) -> Self {
        Self::Network {
            status: Some(status),
            message: format!("HTTP {status}"),
        }
    }
}
