//! Failover timing.
//!
//! While a replicated deployment elects a new leader, the server answers
//! writes with `503` and error number 1495 or 1496. [`FailoverPolicy`]
//! controls how often such a request is retried and for how long.
//!
//! # Example
//!
//! ```
//! use docwire_client::FailoverPolicy;
//! use std::time::Duration;
//!
//! let policy = FailoverPolicy::new()
//!     .interval(Duration::from_millis(500))
//!     .timeout(Duration::from_secs(30));
//! assert!(policy.validate().is_ok());
//! ```

use std::time::Duration;

/// Default failover timing.
pub mod defaults {
    use std::time::Duration;

    /// Default pause between two attempts.
    pub const INTERVAL: Duration = Duration::from_secs(2);

    /// Default overall time budget, measured from the first attempt.
    pub const TIMEOUT: Duration = Duration::from_secs(60);
}

/// Configuration for the failover retry loop.
///
/// # Default Values
///
/// - `interval`: 2 seconds
/// - `timeout`: 60 seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Pause between two attempts.
    pub interval: Duration,

    /// Overall time budget. Started once, at the first attempt, and never
    /// reset by retries.
    pub timeout: Duration,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            interval: defaults::INTERVAL,
            timeout: defaults::TIMEOUT,
        }
    }
}

impl FailoverPolicy {
    /// Create a new FailoverPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause between two attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the overall time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the policy configuration.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.interval.is_zero() {
            return Err("interval must be greater than zero");
        }
        if self.interval > self.timeout {
            return Err("interval must not exceed timeout");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failover_policy_default() {
        let policy = FailoverPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_failover_policy_builder() {
        let policy = FailoverPolicy::new()
            .interval(Duration::from_millis(50))
            .timeout(Duration::from_millis(500));
        assert_eq!(policy.interval, Duration::from_millis(50));
        assert_eq!(policy.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_failover_policy_validate() {
        let zero = FailoverPolicy::new().interval(Duration::ZERO);
        assert!(zero.validate().is_err());

        let inverted = FailoverPolicy {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
        };
        assert!(inverted.validate().is_err());
    }
}
