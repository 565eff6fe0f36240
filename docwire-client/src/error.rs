//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type for every operation
//! of the docwire transport.

use std::time::Duration;

use docwire_core::{BodyError, ServerError};

/// Errors returned by requests, responses and connections.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The caller passed a value of the wrong shape, e.g. a non-sequence
    /// where an array body was required.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Transport-level error (connection failed, body read failed, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a structured error envelope.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// The server answered with an unexpected status and a body that is not
    /// a structured error envelope.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// The operation did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The caller canceled the operation.
    #[error("request canceled")]
    Canceled,
}

impl ClientError {
    /// The code reported for this error, if any.
    ///
    /// For [`ClientError::Server`] this is the envelope's `code`, which is
    /// usually the HTTP status but may be a server specific code. For
    /// [`ClientError::Status`] it is the HTTP status.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Server(err) => u16::try_from(err.code).ok(),
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server error number, only for [`ClientError::Server`].
    pub fn error_num(&self) -> Option<i64> {
        match self {
            ClientError::Server(err) => Some(err.error_num),
            _ => None,
        }
    }

    /// Returns whether the server reported that no leader is available.
    ///
    /// See [`ServerError::is_no_leader`].
    pub fn is_no_leader(&self) -> bool {
        matches!(self, ClientError::Server(err) if err.is_no_leader())
    }

    /// Returns whether this is a [`ClientError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

impl From<BodyError> for ClientError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::InvalidArgument(msg) => ClientError::InvalidArgument(msg),
            BodyError::Encode { operation, message } => {
                ClientError::Encode(format!("{}: {}", operation, message))
            }
            BodyError::Decode(msg) => ClientError::Decode(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_error() {
        let err: ClientError = BodyError::InvalidArgument("bad".into()).into();
        assert!(matches!(err, ClientError::InvalidArgument(ref m) if m == "bad"));

        let err: ClientError = BodyError::Encode {
            operation: "set_body_array",
            message: "unsupported type".into(),
        }
        .into();
        assert!(matches!(err, ClientError::Encode(ref m) if m == "set_body_array: unsupported type"));
    }

    #[test]
    fn test_code() {
        let err = ClientError::Server(ServerError::new(404, 1202, "document not found"));
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.error_num(), Some(1202));

        let err = ClientError::Status {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.error_num(), None);

        assert_eq!(ClientError::Transport("reset".into()).code(), None);
    }

    #[test]
    fn test_code_is_envelope_code() {
        // the envelope may carry a code other than the HTTP status
        let err = ClientError::Server(ServerError::new(1203, 1203, "collection not found"));
        assert_eq!(err.code(), Some(1203));

        let err = ClientError::Server(ServerError::new(-1, 0, "bogus"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_is_no_leader() {
        assert!(ClientError::Server(ServerError::new(503, 1496, "not leader")).is_no_leader());
        assert!(!ClientError::Server(ServerError::new(503, 1, "other")).is_no_leader());
        assert!(!ClientError::Transport("connection refused".into()).is_no_leader());
        assert!(!ClientError::Status {
            status: 503,
            message: "Service Unavailable".into()
        }
        .is_no_leader());
    }
}
