//! Configuration modules for the docwire client.
//!
//! This module contains connection-level configuration:
//! - [`FailoverPolicy`]: Retry timing while the server elects a leader

mod failover;

pub use failover::{FailoverPolicy, defaults};
