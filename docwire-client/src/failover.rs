//! Leader-election tolerant connection wrapper.
//!
//! While a replicated deployment elects a new leader there is briefly no
//! server that accepts writes, and requests fail with `503` and error
//! number 1495 (leadership challenge ongoing) or 1496 (not leader).
//! [`FailoverConnection`] retries such requests at a fixed interval until
//! they succeed, fail differently, or the overall timeout expires.
//!
//! # Example
//!
//! ```ignore
//! use docwire_client::{Connection, FailoverConnection, FailoverPolicy, HttpConnection, Method};
//! use std::time::Duration;
//!
//! let conn = FailoverConnection::with_policy(
//!     HttpConnection::builder("http://localhost:8529").build()?,
//!     FailoverPolicy::new().timeout(Duration::from_secs(30)),
//! );
//!
//! let req = conn.new_request(Method::POST, "_api/document/books");
//! let resp = conn.do_request(&req).await?;
//! ```

use std::future::Future;

use http::Method;
use tokio::time::Instant;

use crate::{ClientError, Connection, FailoverPolicy, Request, Response};

const SERVICE_UNAVAILABLE: u16 = 503;

/// Wraps a [`Connection`] and retries requests that failed because no
/// leader was available.
///
/// Holds no state besides its configuration; the timers of one call are
/// local to that call.
#[derive(Clone, Debug)]
pub struct FailoverConnection<C> {
    inner: C,
    policy: FailoverPolicy,
}

/// Outcome of a single attempt.
enum Attempt {
    Done(Result<Response, ClientError>),
    NoLeader(ClientError),
}

impl<C: Connection> FailoverConnection<C> {
    /// Wrap `inner` with the default policy (2s interval, 60s timeout).
    pub fn new(inner: C) -> Self {
        Self::with_policy(inner, FailoverPolicy::default())
    }

    /// Wrap `inner` with a custom policy.
    pub fn with_policy(inner: C, policy: FailoverPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped connection.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The failover policy.
    pub fn policy(&self) -> &FailoverPolicy {
        &self.policy
    }

    /// Send a request, retrying while no leader is available, until
    /// `cancel` completes.
    ///
    /// The overall timeout starts with the first attempt. `cancel` takes
    /// priority over an in-flight attempt and over both timers.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Canceled`] once `cancel` completes
    /// - [`ClientError::Timeout`] if the policy's timeout expires while waiting
    /// - [`ClientError::InvalidArgument`] for an invalid policy
    /// - any other error of the wrapped connection, unchanged
    pub async fn do_request_with_cancel<F>(
        &self,
        request: &Request,
        cancel: F,
    ) -> Result<Response, ClientError>
    where
        F: Future<Output = ()> + Send,
    {
        self.policy
            .validate()
            .map_err(|msg| ClientError::InvalidArgument(msg.into()))?;

        let deadline = Instant::now() + self.policy.timeout;
        tokio::pin!(cancel);

        #[cfg(feature = "tracing")]
        let mut attempts = 0u32;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = &mut cancel => return Err(ClientError::Canceled),
                outcome = self.attempt(request) => outcome,
            };

            #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
            let err = match outcome {
                Attempt::Done(result) => return result,
                Attempt::NoLeader(err) => err,
            };

            #[cfg(feature = "tracing")]
            {
                attempts += 1;
                tracing::debug!(
                    error = %err,
                    attempt = attempts,
                    interval_ms = self.policy.interval.as_millis(),
                    "no leader available, waiting before retry"
                );
            }

            tokio::select! {
                biased;
                _ = &mut cancel => return Err(ClientError::Canceled),
                _ = tokio::time::sleep_until(deadline) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        attempts,
                        timeout_ms = self.policy.timeout.as_millis(),
                        "gave up waiting for a leader"
                    );
                    return Err(ClientError::Timeout(self.policy.timeout));
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }

    async fn attempt(&self, request: &Request) -> Attempt {
        match self.inner.do_request(request).await {
            Err(err) if err.is_no_leader() => Attempt::NoLeader(err),
            Ok(mut response) if response.status_code() == SERVICE_UNAVAILABLE => {
                // The envelope stays cached, so the caller can still inspect
                // a 503 that is not about leadership.
                match response.check_status(&[]).await {
                    Err(err) if err.is_no_leader() => Attempt::NoLeader(err),
                    _ => Attempt::Done(Ok(response)),
                }
            }
            other => Attempt::Done(other),
        }
    }
}

impl<C: Connection> Connection for FailoverConnection<C> {
    fn new_request(&self, method: Method, path: &str) -> Request {
        self.inner.new_request(method, path)
    }

    fn do_request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, ClientError>> + Send {
        self.do_request_with_cancel(request, std::future::pending())
    }
}
