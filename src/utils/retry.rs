//! Retry policy with exponential backoff
//!
//! The scheduler re-queues failed requests itself, so this module only owns
//! the policy: how many attempts a request gets and how long to wait before
//! each retry.

use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per request, first try included
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with a custom attempt ceiling
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Whether a request that has already been retried `retry_count` times
    /// may go on the wire once more
    pub fn allows_retry(&self, retry_count: u32) -> bool {
        retry_count + 1 < self.max_attempts
    }

    /// Delay before the attempt following `retry_count` earlier retries
    ///
    /// The first attempt (`retry_count == 0`) never waits.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let delay_ms = if retry_count == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((retry_count - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}
