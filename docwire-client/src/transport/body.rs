//! Request body type for HTTP transport.
//!
//! This module provides [`TransportBody`], the body type handed to hyper for
//! every outgoing request.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};

use crate::ClientError;

/// A request body for docwire requests.
///
/// A full body optionally carries a flag that is raised once hyper has taken
/// the payload for transmission, which backs [`Request::written`].
///
/// [`Request::written`]: crate::Request::written
pub enum TransportBody {
    /// Empty request body.
    Empty,
    /// Full request body with all data available.
    Full {
        data: Option<Bytes>,
        written: Option<Arc<AtomicBool>>,
    },
}

impl TransportBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    /// Create a body with the given data.
    pub fn full(data: Bytes) -> Self {
        TransportBody::Full {
            data: Some(data),
            written: None,
        }
    }

    /// Create a body that raises `written` once its data has been taken.
    pub(crate) fn tracked(data: Bytes, written: Arc<AtomicBool>) -> Self {
        TransportBody::Full {
            data: Some(data),
            written: Some(written),
        }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Empty => Poll::Ready(None),
            TransportBody::Full { data, written } => {
                let frame = data.take().map(|d| Ok(Frame::data(d)));
                if frame.is_some() {
                    if let Some(flag) = written {
                        flag.store(true, Ordering::Release);
                    }
                }
                Poll::Ready(frame)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data, .. } => data.is_none(),
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            TransportBody::Empty => http_body::SizeHint::with_exact(0),
            TransportBody::Full { data, .. } => {
                http_body::SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
        }
    }
}

impl Default for TransportBody {
    fn default() -> Self {
        TransportBody::Empty
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data, .. } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
        }
    }
}
