//! Timing configuration for polling

use std::time::Duration;

/// Default time to wait for a backend to reach the expected state
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default spacing between two observations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long to keep observing a backend, and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum time to keep retrying before giving up
    pub timeout: Duration,
    /// Constant delay between two attempts (no backoff)
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Create a configuration with a custom timeout and the default interval
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}
