//! Received responses.
//!
//! A [`Response`] reads its body from the network at most once. The bytes
//! are cached, and object bodies are additionally decoded into a map from
//! top-level field name to value that every later [`Response::parse_body`]
//! call reuses.
//!
//! Field access goes through a `serde_json::Value`, so MessagePack bodies
//! holding `bin` or `ext` values can't be read with `parse_body`. Use
//! [`Response::raw_body`] and decode those bodies with `rmp_serde` directly.

use bytes::Bytes;
use docwire_core::{ServerError, WireFormat};
use http::{HeaderMap, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ClientError;

/// A response from the document database's HTTP API.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    endpoint: String,
    /// Format of the body, taken from the response's content type.
    format: WireFormat,
    body: Option<UnsyncBoxBody<Bytes, ClientError>>,
    bytes: Option<Bytes>,
    /// Decoded top-level object, filled on first field access.
    fields: Option<Value>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("body_read", &self.body.is_none())
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Wrap a received `http::Response` from `endpoint`.
    pub fn new<B>(endpoint: impl Into<String>, response: http::Response<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let format = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(WireFormat::from_content_type)
            .unwrap_or_default();
        let body = body
            .map_err(|e| ClientError::Transport(format!("failed to read response body: {e}")))
            .boxed_unsync();

        Self {
            status: parts.status,
            headers: parts.headers,
            endpoint: endpoint.into(),
            format,
            body: Some(body),
            bytes: None,
            fields: None,
        }
    }

    /// The HTTP status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The endpoint this response came from.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The value of a response header, if present and valid UTF-8.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// The wire format of the body.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The complete body, read from the network on first call.
    pub async fn raw_body(&mut self) -> Result<Bytes, ClientError> {
        if let Some(bytes) = &self.bytes {
            return Ok(bytes.clone());
        }
        let body = self
            .body
            .take()
            .ok_or_else(|| ClientError::Transport("response body already consumed".into()))?;
        let bytes = body.collect().await?.to_bytes();
        self.bytes = Some(bytes.clone());
        Ok(bytes)
    }

    async fn fields(&mut self) -> Result<&Value, ClientError> {
        if self.fields.is_none() {
            let bytes = self.raw_body().await?;
            let value: Value = self.format.decode(&bytes)?;
            if !value.is_object() {
                return Err(ClientError::Decode(
                    "expected an object in response body".into(),
                ));
            }
            self.fields = Some(value);
        }
        self.fields
            .as_ref()
            .ok_or_else(|| ClientError::Decode("response body has no fields".into()))
    }

    /// Check the status code against a set of expected codes.
    ///
    /// For any other status the body is parsed as a [`ServerError`] envelope
    /// and returned as [`ClientError::Server`]. A body that is not an error
    /// envelope yields [`ClientError::Status`] with the status' reason
    /// phrase instead, so a malformed body never hides the status.
    pub async fn check_status(&mut self, valid: &[u16]) -> Result<(), ClientError> {
        let status = self.status_code();
        if valid.contains(&status) {
            return Ok(());
        }

        if let Some(err) = self.server_error().await {
            return Err(ClientError::Server(err));
        }
        Err(ClientError::Status {
            status,
            message: self
                .status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        })
    }

    async fn server_error(&mut self) -> Option<ServerError> {
        let fields = self.fields().await.ok()?;
        let mut err = ServerError::deserialize(fields).ok()?;
        if !err.error {
            return None;
        }
        if err.code == 0 {
            err.code = i64::from(self.status.as_u16());
        }
        Some(err)
    }

    /// Decode the body into `result`.
    ///
    /// With an empty `field` the whole top-level object is decoded into
    /// `result`, so field renames, `#[serde(flatten)]` and `#[serde(skip)]`
    /// apply as usual. `result` is replaced, not updated: a struct field the
    /// body lacks is an error unless it carries `#[serde(default)]`.
    ///
    /// Otherwise only the value of `field` is decoded. If the body has no
    /// such field, or the field is `null`, `result` is left untouched.
    ///
    /// MessagePack `bin` and `ext` values fail to decode here.
    pub async fn parse_body<T>(&mut self, field: &str, result: &mut T) -> Result<(), ClientError>
    where
        T: DeserializeOwned,
    {
        let fields = self.fields().await?;
        let value = if field.is_empty() {
            fields
        } else {
            match fields.get(field) {
                Some(Value::Null) | None => return Ok(()),
                Some(value) => value,
            }
        };
        *result = T::deserialize(value)
            .map_err(|e| ClientError::Decode(format!("failed to decode {field:?}: {e}")))?;
        Ok(())
    }

    /// Decode the whole body as a sequence.
    pub async fn parse_array_body<T>(&mut self) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let bytes = self.raw_body().await?;
        Ok(self.format.decode(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde::Serialize;

    fn response(status: u16, content_type: &str, body: impl Into<Bytes>) -> Response {
        let http = http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Full::new(body.into()))
            .unwrap();
        Response::new("http://db:8529", http)
    }

    fn json_response(status: u16, body: &str) -> Response {
        response(status, "application/json", body.to_string())
    }

    #[tokio::test]
    async fn test_check_status_valid() {
        let mut resp = json_response(201, "{}");
        assert!(resp.check_status(&[200, 201]).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_status_server_error() {
        let mut resp = json_response(
            404,
            r#"{"error":true,"code":1203,"errorMessage":"not found"}"#,
        );
        let err = resp.check_status(&[200, 201]).await.unwrap_err();
        match err {
            ClientError::Server(e) => {
                assert_eq!(e.code, 1203);
                assert_eq!(e.error_message, "not found");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_status_fills_missing_code() {
        let mut resp = json_response(404, r#"{"error":true,"errorNum":1202}"#);
        let err = resp.check_status(&[200]).await.unwrap_err();
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.error_num(), Some(1202));
    }

    #[tokio::test]
    async fn test_check_status_unparseable_body() {
        let mut resp = json_response(500, "<html>oops</html>");
        let err = resp.check_status(&[200, 201]).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status: 500, ref message } if message == "Internal Server Error"
        ));

        // an object without the error flag is not an envelope
        let mut resp = json_response(502, r#"{"code":502}"#);
        let err = resp.check_status(&[200]).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 502, .. }));
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Meta {
        a: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Doc {
        #[serde(flatten)]
        meta: Meta,
        b: i64,
    }

    #[tokio::test]
    async fn test_parse_body_flattened() {
        let mut resp = json_response(200, r#"{"a":"x","b":2}"#);
        let mut doc = Doc::default();
        resp.parse_body("", &mut doc).await.unwrap();
        assert_eq!(
            doc,
            Doc {
                meta: Meta { a: "x".into() },
                b: 2
            }
        );
    }

    #[tokio::test]
    async fn test_parse_body_field() {
        let mut resp = json_response(200, r#"{"a":"x","b":2}"#);

        let mut s = String::new();
        resp.parse_body("a", &mut s).await.unwrap();
        assert_eq!(s, "x");

        let mut untouched = "keep".to_string();
        resp.parse_body("missing", &mut untouched).await.unwrap();
        assert_eq!(untouched, "keep");

        let mut wrong_type = 0u32;
        assert!(resp.parse_body("a", &mut wrong_type).await.is_err());
    }

    #[tokio::test]
    async fn test_parse_body_null_field() {
        let mut resp = json_response(200, r#"{"a":null,"b":2}"#);

        let mut untouched = "keep".to_string();
        resp.parse_body("a", &mut untouched).await.unwrap();
        assert_eq!(untouched, "keep");

        let mut maybe: Option<String> = Some("keep".into());
        resp.parse_body("a", &mut maybe).await.unwrap();
        assert_eq!(maybe.as_deref(), Some("keep"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Strict {
        a: String,
        c: u32,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Lenient {
        a: String,
        #[serde(default)]
        c: u32,
    }

    #[tokio::test]
    async fn test_parse_body_missing_struct_field() {
        let mut resp = json_response(200, r#"{"a":"x","b":2}"#);

        let mut strict = Strict { a: "old".into(), c: 7 };
        let err = resp.parse_body("", &mut strict).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(ref m) if m.contains("`c`")), "{err:?}");
        assert_eq!(strict, Strict { a: "old".into(), c: 7 });

        let mut lenient = Lenient { a: String::new(), c: 7 };
        resp.parse_body("", &mut lenient).await.unwrap();
        assert_eq!(lenient, Lenient { a: "x".into(), c: 0 });
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Renamed {
        #[serde(rename = "_key")]
        key: String,
        #[serde(skip)]
        local: u32,
    }

    #[tokio::test]
    async fn test_parse_body_rename_and_skip() {
        let mut resp = json_response(200, r#"{"_key":"k1","local":9}"#);
        let mut doc = Renamed::default();
        resp.parse_body("", &mut doc).await.unwrap();
        assert_eq!(doc.key, "k1");
        assert_eq!(doc.local, 0);
    }

    #[tokio::test]
    async fn test_body_read_once() {
        let mut resp = json_response(200, r#"{"a":"x","b":2}"#);
        let mut a = String::new();
        let mut b = 0i64;
        resp.parse_body("a", &mut a).await.unwrap();
        resp.parse_body("b", &mut b).await.unwrap();
        assert_eq!((a.as_str(), b), ("x", 2));
        assert_eq!(resp.raw_body().await.unwrap().as_ref(), br#"{"a":"x","b":2}"#);
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[tokio::test]
    async fn test_parse_array_body() {
        let mut resp = json_response(200, r#"[{"id":1},{"id":2}]"#);
        let items: Vec<Item> = resp.parse_array_body().await.unwrap();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);

        // arrays have no top-level fields
        let mut id = 0u32;
        assert!(resp.parse_body("id", &mut id).await.is_err());
    }

    #[tokio::test]
    async fn test_msgpack_response() {
        let body = rmp_serde::to_vec_named(&serde_json::json!({"a": "x", "b": 2})).unwrap();
        let mut resp = response(200, "application/x-msgpack", body);
        assert_eq!(resp.format(), WireFormat::MessagePack);

        let mut doc = Doc::default();
        resp.parse_body("", &mut doc).await.unwrap();
        assert_eq!(doc.meta.a, "x");
        assert_eq!(doc.b, 2);
    }

    #[tokio::test]
    async fn test_msgpack_binary_field() {
        // {"a": bin8 [1, 2]}
        let body: &'static [u8] = &[0x81, 0xa1, b'a', 0xc4, 0x02, 1, 2];
        let mut resp = response(200, "application/x-msgpack", body);

        let mut a: Vec<u8> = Vec::new();
        let err = resp.parse_body("a", &mut a).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)), "{err:?}");

        // the bytes stay available for a caller-side decode
        assert_eq!(resp.raw_body().await.unwrap().as_ref(), body);
    }

    #[test]
    fn test_accessors() {
        let resp = response(202, "application/json; charset=utf-8", "{}");
        assert_eq!(resp.status_code(), 202);
        assert_eq!(resp.endpoint(), "http://db:8529");
        assert_eq!(resp.format(), WireFormat::Json);
        assert_eq!(resp.header("content-type"), Some("application/json; charset=utf-8"));
    }
}
