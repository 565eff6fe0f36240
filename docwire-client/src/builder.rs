//! Connection builder.
//!
//! Provides a fluent API for configuring and building an [`HttpConnection`].

use std::time::Duration;

use docwire_core::WireFormat;

use crate::ClientError;
use crate::connection::HttpConnection;
use crate::transport::HyperTransport;

/// Builder for creating an [`HttpConnection`].
///
/// # Example
///
/// ```ignore
/// use docwire_client::ConnectionBuilder;
/// use std::time::Duration;
///
/// let conn = ConnectionBuilder::new("http://localhost:8529")
///     .use_msgpack()  // Use MessagePack bodies (default is JSON)
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct ConnectionBuilder {
    /// Endpoint URL (e.g., "http://localhost:8529").
    endpoint: String,
    /// Optional pre-configured transport.
    transport: Option<HyperTransport>,
    /// Wire format for request and response bodies.
    format: WireFormat,
    /// Timeout for each request.
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport.is_some())
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionBuilder {
    /// Create a new ConnectionBuilder with the given endpoint URL.
    ///
    /// The endpoint should include the scheme and host, e.g.
    /// "http://localhost:8529". A trailing slash is removed.
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: None,
            format: WireFormat::Json,
            timeout: None,
        }
    }

    /// Use a pre-configured transport.
    ///
    /// This allows you to configure TLS, HTTP/2 and connection pooling, or
    /// to share one pool between connections.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let transport = HyperTransport::builder()
    ///     .pool_max_idle_per_host(8)
    ///     .build()?;
    ///
    /// let conn = ConnectionBuilder::new("http://localhost:8529")
    ///     .transport(transport)
    ///     .build()?;
    /// ```
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use JSON bodies.
    ///
    /// This is the default.
    pub fn use_json(mut self) -> Self {
        self.format = WireFormat::Json;
        self
    }

    /// Use MessagePack bodies.
    ///
    /// Requests carry `Accept: application/x-msgpack`.
    pub fn use_msgpack(mut self) -> Self {
        self.format = WireFormat::MessagePack;
        self
    }

    /// Set the wire format.
    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Set a timeout for each request, covering the time until the
    /// response head arrives.
    ///
    /// Requests exceeding it fail with [`ClientError::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the HttpConnection.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an `http` or `https` URL, or
    /// if the transport cannot be created.
    pub fn build(self) -> Result<HttpConnection, ConnectionBuildError> {
        let endpoint = self.endpoint.trim_end_matches('/').to_string();
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|e| ConnectionBuildError::InvalidEndpoint(format!("{endpoint:?}: {e}")))?;
        match uri.scheme_str() {
            Some("http") | Some("https") if uri.host().is_some() => {}
            _ => {
                return Err(ConnectionBuildError::InvalidEndpoint(format!(
                    "{endpoint:?}: expected an http or https URL"
                )));
            }
        }

        let transport = match self.transport {
            Some(t) => t,
            None => HyperTransport::new().map_err(ConnectionBuildError::Transport)?,
        };

        Ok(HttpConnection::new(
            transport,
            endpoint,
            self.format,
            self.timeout,
        ))
    }
}

/// Error type for connection building failures.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionBuildError {
    /// The endpoint is not a usable URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Failed to create the HTTP transport.
    #[error("failed to create HTTP transport: {0}")]
    Transport(ClientError),
}
