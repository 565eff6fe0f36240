//! Wire formats understood by the document API.
//!
//! Requests and responses travel either as JSON or as MessagePack. Both
//! formats are self-describing, so a body encoded in either can be decoded
//! into a string-keyed map of fields.

use serde::{Serialize, de::DeserializeOwned};

use crate::BodyError;

/// Content type of JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of MessagePack bodies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/x-msgpack";

/// Content type of raw binary bodies passed through without re-encoding.
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of zip archives passed through without re-encoding.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Serialization format of request and response bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// JSON text.
    #[default]
    Json,
    /// MessagePack with named struct fields.
    MessagePack,
}

impl WireFormat {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Json => "json",
            WireFormat::MessagePack => "msgpack",
        }
    }

    /// The `Content-Type` / `Accept` value of this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Json => JSON_CONTENT_TYPE,
            WireFormat::MessagePack => MSGPACK_CONTENT_TYPE,
        }
    }

    /// Detect the format from a `Content-Type` header value.
    ///
    /// Parameters such as `; charset=utf-8` are ignored. Returns `None` for
    /// content types that are neither JSON nor MessagePack.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = media_type(value);
        if mime.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            Some(WireFormat::Json)
        } else if mime.eq_ignore_ascii_case(MSGPACK_CONTENT_TYPE) {
            Some(WireFormat::MessagePack)
        } else {
            None
        }
    }

    /// Encode a value.
    pub fn encode<T>(&self, value: &T) -> Result<Vec<u8>, BodyError>
    where
        T: Serialize + ?Sized,
    {
        self.encode_for("encode", value)
    }

    /// Encode a value, naming `operation` in the error on failure.
    pub(crate) fn encode_for<T>(&self, operation: &'static str, value: &T) -> Result<Vec<u8>, BodyError>
    where
        T: Serialize + ?Sized,
    {
        match self {
            WireFormat::Json => serde_json::to_vec(value).map_err(|e| BodyError::encode(operation, e)),
            WireFormat::MessagePack => {
                rmp_serde::to_vec_named(value).map_err(|e| BodyError::encode(operation, e))
            }
        }
    }

    /// Decode a value.
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<T, BodyError>
    where
        T: DeserializeOwned,
    {
        match self {
            WireFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| BodyError::Decode(format!("JSON decoding failed: {}", e))),
            WireFormat::MessagePack => rmp_serde::from_slice(bytes)
                .map_err(|e| BodyError::Decode(format!("MessagePack decoding failed: {}", e))),
        }
    }
}

/// Returns whether `value` names a binary payload that must be sent as-is.
pub fn is_raw_content_type(value: &str) -> bool {
    let mime = media_type(value);
    mime.eq_ignore_ascii_case(OCTET_STREAM_CONTENT_TYPE) || mime.eq_ignore_ascii_case(ZIP_CONTENT_TYPE)
}

/// Strip parameters from a content type.
fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_content_types() {
        assert_eq!(WireFormat::Json.content_type(), "application/json");
        assert_eq!(WireFormat::MessagePack.content_type(), "application/x-msgpack");
    }

    #[test]
    fn test_from_content_type() {
        assert_eq!(
            WireFormat::from_content_type("application/json; charset=utf-8"),
            Some(WireFormat::Json)
        );
        assert_eq!(
            WireFormat::from_content_type("Application/X-MsgPack"),
            Some(WireFormat::MessagePack)
        );
        assert_eq!(WireFormat::from_content_type("text/plain"), None);
    }

    #[test]
    fn test_is_raw_content_type() {
        assert!(is_raw_content_type("application/octet-stream"));
        assert!(is_raw_content_type("APPLICATION/ZIP"));
        assert!(!is_raw_content_type("application/json"));
    }

    #[test]
    fn test_msgpack_uses_named_fields() {
        let doc = Doc {
            name: "a".into(),
            count: 2,
        };
        let bytes = WireFormat::MessagePack.encode(&doc).unwrap();
        let map: serde_json::Value = WireFormat::MessagePack.decode(&bytes).unwrap();
        assert_eq!(map["name"], "a");
        assert_eq!(map["count"], 2);
    }

    #[test]
    fn test_decode_error() {
        let err = WireFormat::Json.decode::<Doc>(b"not json").unwrap_err();
        assert!(matches!(err, BodyError::Decode(_)));
    }
}
