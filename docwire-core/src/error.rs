//! Error types shared by request encoding and response decoding.
//!
//! This module provides:
//! - [`BodyError`]: Failures raised while building a request body
//! - [`ServerError`]: The structured error envelope returned by the server
//! - [`error_num`]: Well-known server error numbers

use serde::{Deserialize, Serialize};

/// Well-known error numbers carried in the `errorNum` field of a
/// [`ServerError`].
pub mod error_num {
    /// A document with the requested key does not exist.
    pub const DOCUMENT_NOT_FOUND: i64 = 1202;

    /// The requested collection does not exist.
    pub const COLLECTION_NOT_FOUND: i64 = 1203;

    /// A leadership challenge is running and no leader is available yet.
    pub const CLUSTER_LEADERSHIP_CHALLENGE_ONGOING: i64 = 1495;

    /// The contacted server is not the current leader.
    pub const CLUSTER_NOT_LEADER: i64 = 1496;
}

/// HTTP status the server uses when no leader is available.
const SERVICE_UNAVAILABLE: i64 = 503;

/// Errors raised while encoding a request body.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    /// The caller passed a value of the wrong shape or arity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The serializer rejected a value.
    #[error("{operation}: encoding failed: {message}")]
    Encode {
        operation: &'static str,
        message: String,
    },

    /// Bytes could not be decoded in the expected wire format.
    #[error("decode error: {0}")]
    Decode(String),
}

impl BodyError {
    pub(crate) fn invalid_argument<S: Into<String>>(message: S) -> Self {
        BodyError::InvalidArgument(message.into())
    }

    pub(crate) fn encode<E: std::fmt::Display>(operation: &'static str, err: E) -> Self {
        BodyError::Encode {
            operation,
            message: err.to_string(),
        }
    }
}

/// The structured error envelope returned by the server on failure.
///
/// # Wire Format
///
/// ```json
/// {"error": true, "code": 404, "errorNum": 1203, "errorMessage": "collection not found"}
/// ```
///
/// `code` usually repeats the HTTP status while `errorNum` carries the
/// server-specific error number. Both are optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error_message} (code {code}, error {error_num})")]
pub struct ServerError {
    /// Set by the server when the envelope describes an error.
    #[serde(default)]
    pub error: bool,

    /// Numeric error code, usually the HTTP status.
    #[serde(default)]
    pub code: i64,

    /// Server-specific error number.
    #[serde(default, rename = "errorNum")]
    pub error_num: i64,

    /// Human readable message.
    #[serde(default, rename = "errorMessage")]
    pub error_message: String,
}

impl ServerError {
    /// Create a new error envelope.
    pub fn new<S: Into<String>>(code: i64, error_num: i64, message: S) -> Self {
        Self {
            error: true,
            code,
            error_num,
            error_message: message.into(),
        }
    }

    /// Returns whether the server reported that no leader is currently
    /// available to serve the request.
    ///
    /// This happens while a replicated deployment elects a new leader and is
    /// resolved by retrying after a short pause.
    pub fn is_no_leader(&self) -> bool {
        self.code == SERVICE_UNAVAILABLE
            && matches!(
                self.error_num,
                error_num::CLUSTER_LEADERSHIP_CHALLENGE_ONGOING | error_num::CLUSTER_NOT_LEADER
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_deserialize() {
        let err: ServerError = serde_json::from_str(
            r#"{"error":true,"code":404,"errorNum":1203,"errorMessage":"collection not found"}"#,
        )
        .unwrap();
        assert!(err.error);
        assert_eq!(err.code, 404);
        assert_eq!(err.error_num, error_num::COLLECTION_NOT_FOUND);
        assert_eq!(err.error_message, "collection not found");
    }

    #[test]
    fn test_server_error_missing_fields_default() {
        let err: ServerError = serde_json::from_str(r#"{"error":true}"#).unwrap();
        assert_eq!(err.code, 0);
        assert_eq!(err.error_num, 0);
        assert!(err.error_message.is_empty());
    }

    #[test]
    fn test_server_error_is_no_leader() {
        assert!(ServerError::new(503, 1495, "challenge ongoing").is_no_leader());
        assert!(ServerError::new(503, 1496, "not leader").is_no_leader());

        assert!(!ServerError::new(503, 1203, "other").is_no_leader());
        assert!(!ServerError::new(500, 1496, "wrong status").is_no_leader());
    }

    #[test]
    fn test_body_error_display() {
        let err = BodyError::encode("set_body", "unsupported type");
        assert_eq!(err.to_string(), "set_body: encoding failed: unsupported type");
    }
}
