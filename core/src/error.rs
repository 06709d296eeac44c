//! Error types for the Craft Blocks client.
//!
//! # Design
//! Four kinds, one per stage of a call: building the request, moving it over
//! the wire, interpreting the status, decoding the body. A 207 on delete or
//! move is a success and never shows up here.

use thiserror::Error;

/// Errors returned by `CraftClient` and `BlockingClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be built: serialization failed or a local
    /// precondition (update ids present, non-empty search pattern) was violated.
    #[error("building request failed: {0}")]
    Construction(String),

    /// The request did not complete (DNS, connect, TLS, timeout, I/O).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a status the operation does not accept.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("decoding response failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// A 4xx answer: bad input or a missing resource.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::UnexpectedStatus { status, .. } if (400..500).contains(status))
    }

    /// A 5xx answer: the remote side failed.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::UnexpectedStatus { status, .. } if (500..600).contains(status))
    }

    /// Whether repeating the identical call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_)) || self.is_server_error()
    }

    /// Status code carried by an `UnexpectedStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_ranges() {
        let not_found = ApiError::UnexpectedStatus { status: 404, body: String::new() };
        assert!(not_found.is_client_error());
        assert!(!not_found.is_server_error());
        assert!(!not_found.is_retryable());

        let unavailable = ApiError::UnexpectedStatus { status: 503, body: String::new() };
        assert!(unavailable.is_server_error());
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        let err = ApiError::Transport("connection refused".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = ApiError::UnexpectedStatus { status: 400, body: "bad position".to_string() };
        assert_eq!(err.to_string(), "unexpected status 400: bad position");
    }
}
