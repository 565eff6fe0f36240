//! HTTP transport for a replicated document database.
//!
//! This crate sends requests to the database's HTTP API and hands back
//! responses, in JSON or MessagePack, and can wrap a connection so that
//! requests survive a leader election.
//!
//! ## Features
//!
//! - Request building with query parameters, headers and typed bodies
//! - Merge-patch bodies, array bodies and bulk import bodies
//! - Raw passthrough bodies for pre-encoded binary payloads
//! - Lazy, cached response decoding with field selection
//! - Structured server errors
//! - Leader failover with bounded retry and cancellation
//!
//! ## Example
//!
//! ```ignore
//! use docwire_client::{Connection, FailoverConnection, HttpConnection, Method};
//!
//! let conn = FailoverConnection::new(
//!     HttpConnection::builder("http://localhost:8529")
//!         .use_msgpack()
//!         .build()?,
//! );
//!
//! let mut req = conn.new_request(Method::POST, "_api/document/books");
//! req.set_body_merge(&book, &serde_json::json!({"_key": "dune"}))?;
//!
//! let mut resp = conn.do_request(&req).await?;
//! resp.check_status(&[201, 202]).await?;
//!
//! let mut key = String::new();
//! resp.parse_body("_key", &mut key).await?;
//! ```
//!
//! ## Bulk Import Example
//!
//! ```ignore
//! let mut req = conn.new_request(Method::POST, "_api/import");
//! req.set_query("collection", "books")
//!     .set_body_import_array(&books)?;
//!
//! let mut resp = conn.do_request(&req).await?;
//! resp.check_status(&[201]).await?;
//! ```

mod builder;
mod config;
mod connection;
mod error;
mod failover;
mod request;
mod response;
pub mod transport;

pub use builder::{ConnectionBuildError, ConnectionBuilder};
pub use config::{FailoverPolicy, defaults};
pub use connection::{Connection, HttpConnection};
pub use error::ClientError;
pub use failover::FailoverConnection;
pub use request::Request;
pub use response::Response;
pub use transport::{HyperTransport, HyperTransportBuilder, TlsClientConfig};

// Re-export core types
pub use docwire_core::{
    BodyBuilder, BodyError, ImportLayout, ServerError, WireFormat, error_num, merge_patch,
};

// Re-export http types used in the API
pub use http::Method;
