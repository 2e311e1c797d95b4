//! Doubling backoff schedule.

use super::strategy::BackoffStrategy;
use std::time::Duration;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Exponential backoff.
///
/// The wait after failed attempt `n` (0-indexed) is
/// `initial_delay * multiplier^n`, never more than `max_delay`. The
/// defaults give 1s, 2s, 4s, 8s, ...
///
/// # Examples
///
/// ```rust
/// use orgapi_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(250))
///     .max_delay(Duration::from_secs(2))
///     .build();
///
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(500)));
/// assert_eq!(backoff.next_delay(6), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    /// Start configuring a schedule from the defaults.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Wait after the first failure.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Cap on any single wait.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Same schedule, different retry budget.
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self.clone()
        }
    }

    fn undelayed(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        // NaN (zero delay times an infinite factor) becomes zero
        let seconds = self
            .undelayed(attempt)
            .max(0.0)
            .min(self.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(seconds))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Fluent configuration for [`ExponentialBackoff`].
#[derive(Debug, Clone)]
pub struct ExponentialBackoffBuilder {
    schedule: ExponentialBackoff,
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self {
            schedule: ExponentialBackoff {
                max_retries: DEFAULT_RETRIES,
                initial_delay: DEFAULT_INITIAL_DELAY,
                max_delay: DEFAULT_MAX_DELAY,
                multiplier: DEFAULT_MULTIPLIER,
            },
        }
    }
}

impl ExponentialBackoffBuilder {
    /// Retries after the first attempt (default 3).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.schedule.max_retries = max_retries;
        self
    }

    /// Wait after the first failure (default 1s).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.schedule.initial_delay = delay;
        self
    }

    /// Cap on any single wait (default 60s).
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.schedule.max_delay = delay;
        self
    }

    /// Growth factor between waits (default 2.0).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.schedule.multiplier = multiplier;
        self
    }

    /// Finish configuration.
    pub fn build(self) -> ExponentialBackoff {
        self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_doubles_from_one_second() {
        let backoff = ExponentialBackoff::default();

        let schedule: Vec<_> = (0..4).map(|n| backoff.next_delay(n).unwrap()).collect();
        assert_eq!(
            schedule,
            [1, 2, 4, 8].map(Duration::from_secs).to_vec()
        );
        assert_eq!(backoff.total_attempts(), 4);
    }

    #[test]
    fn test_cap_applies_to_large_attempts() {
        let backoff = ExponentialBackoff::builder()
            .multiplier(10.0)
            .max_delay(Duration::from_secs(5))
            .build();

        assert_eq!(backoff.next_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_delay(u32::MAX), Some(Duration::from_secs(5)));

        let zero = ExponentialBackoff::builder().initial_delay(Duration::ZERO).build();
        assert_eq!(zero.next_delay(u32::MAX), Some(Duration::ZERO));
    }

    #[test]
    fn test_fractional_multiplier() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(500))
            .multiplier(1.5)
            .build();

        assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(750)));
        assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(1125)));
    }

    #[test]
    fn test_budget_override_keeps_delays() {
        let base = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(10))
            .build();
        let none = base.with_max_retries(0);

        assert_eq!(none.total_attempts(), 1);
        assert_eq!(none.next_delay(3), base.next_delay(3));
    }
}
