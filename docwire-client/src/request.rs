//! Outgoing requests.
//!
//! A [`Request`] collects method, path, query parameters, headers and a
//! [`BodyBuilder`], and is turned into an `http::Request` only when a
//! connection sends it. Requests are created by
//! [`Connection::new_request`](crate::Connection::new_request) so that the
//! body builder matches the connection's wire format.
//!
//! # Example
//!
//! ```ignore
//! use docwire_client::{Connection, Method};
//!
//! let mut req = conn.new_request(Method::POST, "_api/document/books");
//! req.set_query("waitForSync", "true")
//!     .set_body(&book)?;
//! let mut resp = conn.do_request(&req).await?;
//! resp.check_status(&[201, 202]).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use docwire_core::{BodyBuilder, ImportLayout, WireFormat};
use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;
use serde_json::Value;

use crate::ClientError;
use crate::transport::TransportBody;

/// A request to the document database's HTTP API.
///
/// Mutating methods return `&mut Self` so calls can be chained. A request
/// is not shared between threads while it is being built, but a finished
/// request can be sent any number of times, e.g. by the failover wrapper.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    /// Wire format the connection expects responses in.
    format: WireFormat,
    body: BodyBuilder,
    written: Arc<AtomicBool>,
}

impl Request {
    /// Create a request with an empty body builder for `format`.
    pub fn new<P: Into<String>>(method: Method, path: P, format: WireFormat) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: HeaderMap::new(),
            format,
            body: BodyBuilder::new(format),
            written: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path, relative to the connection's endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The values of a query parameter.
    pub fn query(&self, key: &str) -> Option<&[String]> {
        self.query.get(key).map(Vec::as_slice)
    }

    /// The value of a header, if set and valid UTF-8.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// The wire format responses are expected in.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The active body builder.
    pub fn body(&self) -> &BodyBuilder {
        &self.body
    }

    /// Set a query parameter, replacing any previous values for `key`.
    pub fn set_query<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.insert(key.into(), vec![value.into()]);
        self
    }

    /// Append a value to a query parameter, keeping previous values.
    pub fn add_query<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Set a header, replacing any previous value. Header names are
    /// case-insensitive.
    ///
    /// Setting `Content-Type` to a raw binary type such as
    /// `application/octet-stream` or `application/zip` swaps the body builder
    /// for a raw passthrough builder, so pre-encoded payloads can be sent
    /// with [`set_raw_body`](Self::set_raw_body) or [`set_body`](Self::set_body).
    /// Other content types leave the connection's builder in place.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<&mut Self, ClientError> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ClientError::InvalidArgument(format!("invalid header name {key:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::InvalidArgument(format!("invalid value for header {key:?}: {e}"))
        })?;

        if name == CONTENT_TYPE {
            if let Some(raw @ BodyBuilder::Raw { .. }) = BodyBuilder::for_content_type(value) {
                self.body = raw;
            }
        }
        self.headers.insert(name, header_value);
        Ok(self)
    }

    /// Encode a single value as the body.
    pub fn set_body<T>(&mut self, body: &T) -> Result<&mut Self, ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.body.set_body(body)?;
        Ok(self)
    }

    /// Use `payload` as the body of a raw request without copying it.
    ///
    /// Fails unless `Content-Type` was first set to a raw binary type.
    pub fn set_raw_body<B: Into<Bytes>>(&mut self, payload: B) -> Result<&mut Self, ClientError> {
        self.body.set_raw_body(payload)?;
        Ok(self)
    }

    /// Encode the fields of `patch` merged over the fields of `base`.
    pub fn set_body_merge<B, P>(&mut self, base: &B, patch: &P) -> Result<&mut Self, ClientError>
    where
        B: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        self.body.set_body_merge(base, patch)?;
        Ok(self)
    }

    /// Set the body from one part, or a `(base, patch)` pair.
    pub fn set_body_parts(&mut self, parts: &[Value]) -> Result<&mut Self, ClientError> {
        self.body.set_body_parts(parts)?;
        Ok(self)
    }

    /// Encode a sequence as a single array.
    pub fn set_body_array<T>(&mut self, items: &T) -> Result<&mut Self, ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.body.set_body_array(items)?;
        Ok(self)
    }

    /// Encode a sequence as a single array with one merge patch per element.
    pub fn set_body_array_merged<T, P>(
        &mut self,
        items: &T,
        patches: &[P],
    ) -> Result<&mut Self, ClientError>
    where
        T: Serialize + ?Sized,
        P: Serialize,
    {
        self.body.set_body_array_merged(items, patches)?;
        Ok(self)
    }

    /// Encode a sequence for the bulk import endpoint.
    ///
    /// Sets `type=list` when the body had to be encoded as one array.
    pub fn set_body_import_array<T>(&mut self, items: &T) -> Result<&mut Self, ClientError>
    where
        T: Serialize + ?Sized,
    {
        if self.body.set_body_import_array(items)? == ImportLayout::List {
            self.set_query("type", "list");
        }
        Ok(self)
    }

    /// Returns true once the request has been handed to the network.
    ///
    /// This is advisory: a written request may still not have reached the
    /// server, but a request that was never written certainly did not.
    pub fn written(&self) -> bool {
        self.written.load(Ordering::Acquire)
    }

    pub(crate) fn mark_written(&self) {
        self.written.store(true, Ordering::Release);
    }

    /// Build the `http::Request` for `endpoint`.
    ///
    /// The URL is `endpoint` and the path joined by exactly one `/`, followed
    /// by the form-encoded query. `Content-Type` and `Content-Length` come
    /// from the body builder when a body is set, and non-JSON connections
    /// always send `Accept`.
    pub fn to_http(&self, endpoint: &str) -> Result<http::Request<TransportBody>, ClientError> {
        let mut url = format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        if !self.query.is_empty() {
            let pairs: Vec<(&str, &str)> = self
                .query
                .iter()
                .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
                .collect();
            let encoded = serde_urlencoded::to_string(&pairs)
                .map_err(|e| ClientError::Encode(format!("query: {e}")))?;
            url.push('?');
            url.push_str(&encoded);
        }
        let uri: Uri = url
            .parse()
            .map_err(|e| ClientError::InvalidArgument(format!("invalid url {url:?}: {e}")))?;

        let body = if self.body.is_empty() {
            TransportBody::empty()
        } else {
            TransportBody::tracked(self.body.body().clone(), self.written.clone())
        };

        let mut request = http::Request::new(body);
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers.clone();

        let headers = request.headers_mut();
        if !self.body.is_empty() {
            let content_type = HeaderValue::from_str(self.body.content_type()).map_err(|e| {
                ClientError::InvalidArgument(format!("invalid content type: {e}"))
            })?;
            headers.insert(CONTENT_TYPE, content_type);
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.body().len()));
        }
        if self.format != WireFormat::Json {
            headers.insert(ACCEPT, HeaderValue::from_static(self.format.content_type()));
        }

        Ok(request)
    }

    /// The encoded body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        self.body.body()
    }
}

impl Clone for Request {
    /// Copies everything except the written state: the clone starts
    /// unwritten.
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            format: self.format,
            body: self.body.clone(),
            written: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(format: WireFormat) -> Request {
        Request::new(Method::POST, "_api/document/books", format)
    }

    #[test]
    fn test_set_query_replaces_values() {
        let mut req = request(WireFormat::Json);
        req.add_query("keep", "a").add_query("keep", "b");
        assert_eq!(req.query("keep"), Some(&["a".to_string(), "b".to_string()][..]));

        req.set_query("keep", "c");
        assert_eq!(req.query("keep"), Some(&["c".to_string()][..]));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn test_set_header_case_insensitive() {
        let mut req = request(WireFormat::Json);
        req.set_header("X-Custom", "one").unwrap();
        req.set_header("x-custom", "two").unwrap();
        assert_eq!(req.header("X-CUSTOM"), Some("two"));
    }

    #[test]
    fn test_set_header_rejects_invalid() {
        let mut req = request(WireFormat::Json);
        let err = req.set_header("bad header", "x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));

        let err = req.set_header("x-ok", "line\nbreak").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_raw_content_type_swaps_builder() {
        let mut req = request(WireFormat::MessagePack);
        req.set_header("Content-Type", "application/zip").unwrap();
        assert!(matches!(req.body(), BodyBuilder::Raw { .. }));

        req.set_body(&b"PK\x03\x04".to_vec()).unwrap();
        assert_eq!(req.body_bytes().as_ref(), b"PK\x03\x04");
        assert_eq!(req.body().content_type(), "application/zip");

        // raw bodies can't be merged
        let err = req.set_body_merge(&json!({"a": 1}), &json!({"a": 2})).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_plain_content_type_keeps_builder() {
        let mut req = request(WireFormat::Json);
        req.set_header("Content-Type", "application/json").unwrap();
        assert!(matches!(req.body(), BodyBuilder::Json(_)));

        let mut req = request(WireFormat::MessagePack);
        req.set_header("content-type", "application/json; charset=utf-8").unwrap();
        assert!(matches!(req.body(), BodyBuilder::MessagePack(_)));

        req.set_header("Content-Type", "text/plain").unwrap();
        assert!(matches!(req.body(), BodyBuilder::MessagePack(_)));
    }

    #[test]
    fn test_set_raw_body() {
        let mut req = request(WireFormat::Json);
        let err = req.set_raw_body(Bytes::from_static(b"PK")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(req.body().is_empty());

        req.set_header("Content-Type", "application/zip").unwrap();
        req.set_raw_body(Bytes::from_static(b"PK\x03\x04")).unwrap();
        assert_eq!(req.body_bytes().as_ref(), b"PK\x03\x04");

        let http = req.to_http("http://localhost:8529").unwrap();
        assert_eq!(http.headers()[CONTENT_TYPE], "application/zip");
        assert_eq!(http.headers()[CONTENT_LENGTH], "4");
    }

    #[test]
    fn test_set_body_parts_arity() {
        let mut req = request(WireFormat::Json);
        let err = req.set_body_parts(&[]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(ref m) if m.contains("1 or 2")));

        let parts = [json!({}), json!({}), json!({})];
        assert!(req.set_body_parts(&parts).is_err());
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_import_array_list_layout_sets_type() {
        let mut req = request(WireFormat::MessagePack);
        req.set_body_import_array(&[json!({"a": 1}), json!({"a": 2})]).unwrap();
        assert_eq!(req.query("type"), Some(&["list".to_string()][..]));

        let mut req = request(WireFormat::Json);
        req.set_body_import_array(&[json!({"a": 1})]).unwrap();
        assert_eq!(req.query("type"), None);
        assert_eq!(req.body_bytes().as_ref(), b"{\"a\":1}\n");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut req = request(WireFormat::Json);
        req.set_query("q", "1")
            .set_header("x-a", "1")
            .unwrap()
            .set_body(&json!({"v": 1}))
            .unwrap();
        req.mark_written();

        let mut clone = req.clone();
        assert!(!clone.written());
        clone
            .set_query("q", "2")
            .add_query("q", "3")
            .set_header("x-a", "2")
            .unwrap()
            .set_body(&json!({"v": 2}))
            .unwrap();

        assert_eq!(req.query("q"), Some(&["1".to_string()][..]));
        assert_eq!(req.header("x-a"), Some("1"));
        assert_eq!(req.body_bytes().as_ref(), b"{\"v\":1}");
        assert!(req.written());
    }

    #[test]
    fn test_to_http_joins_path() {
        let cases = [
            ("http://db:8529", "_api/version"),
            ("http://db:8529/", "_api/version"),
            ("http://db:8529", "/_api/version"),
            ("http://db:8529/", "/_api/version"),
        ];
        for (endpoint, path) in cases {
            let req = Request::new(Method::GET, path, WireFormat::Json);
            let http = req.to_http(endpoint).unwrap();
            assert_eq!(http.uri(), "http://db:8529/_api/version", "{endpoint} + {path}");
        }
    }

    #[test]
    fn test_to_http_query_and_headers() {
        let mut req = request(WireFormat::Json);
        req.set_query("waitForSync", "true")
            .add_query("tag", "a b")
            .add_query("tag", "c&d")
            .set_header("x-request-id", "42")
            .unwrap()
            .set_body(&json!({"title": "Dune"}))
            .unwrap();

        let http = req.to_http("http://db:8529").unwrap();
        assert_eq!(http.method(), Method::POST);
        assert_eq!(
            http.uri(),
            "http://db:8529/_api/document/books?tag=a+b&tag=c%26d&waitForSync=true"
        );
        let headers = http.headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[CONTENT_LENGTH], "16");
        assert_eq!(headers["x-request-id"], "42");
        assert!(headers.get(ACCEPT).is_none());
    }

    #[test]
    fn test_to_http_empty_body() {
        let req = Request::new(Method::GET, "_api/version", WireFormat::MessagePack);
        let http = req.to_http("http://db:8529").unwrap();
        assert!(http.headers().get(CONTENT_TYPE).is_none());
        assert!(http.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(http.headers()[ACCEPT], "application/x-msgpack");
    }

    #[test]
    fn test_to_http_invalid_endpoint() {
        let req = Request::new(Method::GET, "_api/version", WireFormat::Json);
        let err = req.to_http("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_to_http_body_marks_written() {
        use http_body_util::BodyExt;

        let mut req = request(WireFormat::Json);
        req.set_body(&json!({"a": 1})).unwrap();
        let http = req.to_http("http://db:8529").unwrap();
        assert!(!req.written());

        let bytes = http.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"{\"a\":1}");
        assert!(req.written());
    }
}
