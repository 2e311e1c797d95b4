//! The retry strategy abstraction.

use std::time::Duration;

/// A retry budget and the wait between attempts.
///
/// The request executor drives the attempt loop itself: it decides from the
/// HTTP status whether an attempt is worth repeating and asks the strategy
/// how long to wait and how many retries remain.
///
/// # Examples
///
/// ```rust
/// use orgapi_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(10))
///     .build();
///
/// let waits: Vec<_> = (0..backoff.max_retries()).filter_map(|n| backoff.next_delay(n)).collect();
/// assert_eq!(waits, [Duration::from_millis(10), Duration::from_millis(20)]);
/// assert_eq!(backoff.total_attempts(), 3);
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Delay to wait after the failed attempt with index `attempt` (0-indexed).
    ///
    /// Returns `None` when no delay should be applied.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of retries after the initial attempt.
    ///
    /// `max_retries() == 3` means up to 4 attempts in total.
    fn max_retries(&self) -> u32;

    /// Total number of attempts this strategy allows.
    fn total_attempts(&self) -> u32 {
        self.max_retries().saturating_add(1)
    }
}
