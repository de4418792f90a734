//! Retry policies for gateway requests.

use std::time::Duration;

/// Retry policy for a request.
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// No retries. Used for charges and transfers.
    #[default]
    None,
    /// Retry on transport failures and retryable statuses using the
    /// client's configuration.
    Idempotent,
    /// Explicit configuration for one call.
    Custom(RetryConfig),
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: u32,
    /// Whether to spread delays by up to a quarter in either direction.
    pub jitter: bool,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2,
            jitter: true,
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Returns true if a response with `status` should be retried.
    #[must_use]
    pub fn retries_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let initial = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = u64::from(self.backoff_factor).saturating_pow(attempt);
        let capped = initial.saturating_mul(factor).min(max);

        let millis = if self.jitter && capped >= 4 {
            let spread = capped / 4;
            rand::random_range(capped - spread..=capped.saturating_add(spread))
        } else {
            capped
        };

        Duration::from_millis(millis)
    }
}
