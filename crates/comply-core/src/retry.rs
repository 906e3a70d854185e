//! Retry policy shared by every retried endpoint call.

use std::time::Duration;

use crate::error::{ErrorKind, ProtocolError};

/// Additional attempts made after the first one fails.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Base of the exponential delay applied to network timeouts.
pub const DEFAULT_NETWORK_BASE_DELAY: Duration = Duration::from_secs(1);
/// Fixed delay applied to HTTP 429 / 5xx responses.
pub const DEFAULT_SERVER_BUSY_DELAY: Duration = Duration::from_secs(5);

/// How many times, and how long apart, a failed request is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub network_base_delay: Duration,
    pub server_busy_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            network_base_delay: DEFAULT_NETWORK_BASE_DELAY,
            server_busy_delay: DEFAULT_SERVER_BUSY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), or `None` if `err`
    /// must not be retried at all.
    pub fn delay_for(&self, err: &ProtocolError, attempt: u32) -> Option<Duration> {
        if !err.should_retry() {
            return None;
        }

        match err.kind() {
            ErrorKind::Network => {
                let factor = 2u32.saturating_pow(attempt);
                Some(self.network_base_delay.saturating_mul(factor))
            }
            ErrorKind::Http | ErrorKind::HttpStructured => {
                Some(err.retry_after().unwrap_or(self.server_busy_delay))
            }
            _ => None,
        }
    }
}
