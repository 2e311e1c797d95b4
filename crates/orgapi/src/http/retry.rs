//! Retry policy for the request executor
//!
//! Wraps the generic [`ExponentialBackoff`] from `orgapi-core` and adds the
//! HTTP-specific rules: which statuses are retried and how long to wait
//! after a rate limit response.

use std::time::Duration;

use orgapi_core::retry::{BackoffStrategy, ExponentialBackoff};

use crate::error::{ApiError, RETRYABLE_STATUSES};

/// HTTP retry policy.
///
/// # Default Configuration
///
/// - `max_retries`: 3 (four attempts in total)
/// - `initial_delay`: 1s, doubling per attempt (1s, 2s, 4s, ...)
/// - `max_delay`: 60s
/// - no jitter
///
/// # Examples
///
/// ```rust
/// use orgapi::http::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(2, Duration::from_millis(100));
/// assert_eq!(policy.total_attempts(), 3);
/// assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
/// assert!(policy.should_retry_status(503));
/// assert!(!policy.should_retry_status(401));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    inner: ExponentialBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_RETRIES, crate::DEFAULT_RETRY_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Policy with `max_retries` retries starting at `base_delay`.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner: ExponentialBackoff::builder()
                .max_retries(max_retries)
                .initial_delay(base_delay)
                .build(),
        }
    }

    /// Wrap a fully configured backoff.
    pub fn from_backoff(inner: ExponentialBackoff) -> Self {
        Self { inner }
    }

    /// Copy of this policy with a different retry budget.
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        Self {
            inner: self.inner.with_max_retries(max_retries),
        }
    }

    /// Configured number of retries.
    pub fn max_retries(&self) -> u32 {
        self.inner.max_retries()
    }

    /// `max_retries + 1`.
    pub fn total_attempts(&self) -> u32 {
        self.inner.total_attempts()
    }

    /// Whether a response status is worth another attempt.
    ///
    /// 429 and the statuses in [`RETRYABLE_STATUSES`] are retried; 401 and
    /// every other status are not.
    pub fn should_retry_status(&self, status: u16) -> bool {
        status == 429 || RETRYABLE_STATUSES.contains(&status)
    }

    /// Exponential delay after the failed attempt `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.inner
            .next_delay(attempt)
            .unwrap_or_else(|| self.inner.initial_delay())
    }

    /// Delay before retrying after `error`.
    ///
    /// Rate limit errors carry their own delay; everything else backs off
    /// exponentially.
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }

    /// The underlying backoff strategy.
    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.inner
    }
}
