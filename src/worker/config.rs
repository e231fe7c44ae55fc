//! Worker configuration
//!
//! Polling and retry settings for the delivery worker.

use std::time::Duration;

/// Idle wait between peeks on an empty queue
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Delivery count at which a transient failure dead-letters instead of retrying
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff is `unit * base^attempt`
pub const DEFAULT_BACKOFF_BASE: u32 = 5;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Configuration for the delivery worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub backoff_base: u32,
    pub backoff_unit: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: u32) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Delay before redelivery after a transient failure at `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.saturating_pow(attempt);
        self.backoff_unit
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }

    /// Whether the retry budget is spent at `attempt`
    pub fn retries_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
