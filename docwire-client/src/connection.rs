//! Connections to a database endpoint.
//!
//! [`Connection`] is the seam between request building and the network:
//! [`HttpConnection`] sends requests over HTTP, and
//! [`FailoverConnection`](crate::FailoverConnection) wraps any connection to
//! ride out leader elections.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use docwire_core::WireFormat;
use http::Method;

use crate::transport::HyperTransport;
use crate::{ClientError, ConnectionBuilder, Request, Response};

/// A connection to the document database.
pub trait Connection: Send + Sync {
    /// Create a request whose body builder matches this connection's wire
    /// format.
    fn new_request(&self, method: Method, path: &str) -> Request;

    /// Send a request and wait for the response head.
    ///
    /// The request is borrowed so that it can be sent again.
    fn do_request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, ClientError>> + Send;
}

impl<C: Connection> Connection for &C {
    fn new_request(&self, method: Method, path: &str) -> Request {
        (**self).new_request(method, path)
    }

    fn do_request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, ClientError>> + Send {
        (**self).do_request(request)
    }
}

impl<C: Connection> Connection for Arc<C> {
    fn new_request(&self, method: Method, path: &str) -> Request {
        (**self).new_request(method, path)
    }

    fn do_request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, ClientError>> + Send {
        (**self).do_request(request)
    }
}

/// A connection to a single HTTP endpoint.
///
/// Cloning is cheap and shares the transport's connection pool.
///
/// # Example
///
/// ```ignore
/// use docwire_client::{Connection, HttpConnection, Method};
///
/// let conn = HttpConnection::builder("http://localhost:8529")
///     .use_msgpack()
///     .build()?;
///
/// let req = conn.new_request(Method::GET, "_api/version");
/// let mut resp = conn.do_request(&req).await?;
/// resp.check_status(&[200]).await?;
/// ```
#[derive(Clone, Debug)]
pub struct HttpConnection {
    transport: HyperTransport,
    endpoint: String,
    format: WireFormat,
    request_timeout: Option<Duration>,
}

impl HttpConnection {
    /// Create a new connection builder for `endpoint`.
    pub fn builder<S: Into<String>>(endpoint: S) -> ConnectionBuilder {
        ConnectionBuilder::new(endpoint)
    }

    pub(crate) fn new(
        transport: HyperTransport,
        endpoint: String,
        format: WireFormat,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            endpoint,
            format,
            request_timeout,
        }
    }

    /// The endpoint URL, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The wire format used for request and response bodies.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The per-request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

impl Connection for HttpConnection {
    fn new_request(&self, method: Method, path: &str) -> Request {
        Request::new(method, path, self.format)
    }

    async fn do_request(&self, request: &Request) -> Result<Response, ClientError> {
        let http_request = request.to_http(&self.endpoint)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method(),
            uri = %http_request.uri(),
            format = self.format.as_str(),
            "sending request"
        );

        let send = self.transport.request(http_request);
        let response = match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, send)
                .await
                .map_err(|_| ClientError::Timeout(timeout))??,
            None => send.await?,
        };
        request.mark_written();

        #[cfg(feature = "tracing")]
        tracing::debug!(status = response.status().as_u16(), "received response");

        Ok(Response::new(self.endpoint.clone(), response))
    }
}
