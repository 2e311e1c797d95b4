//! Backoff schedules.
//!
//! [`BackoffStrategy`] describes a retry budget and the wait between
//! attempts; [`ExponentialBackoff`] is the doubling schedule used by the
//! request executor.
//!
//! # Examples
//!
//! ```rust
//! use orgapi_core::retry::{BackoffStrategy, ExponentialBackoff};
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::default();
//! assert_eq!(backoff.next_delay(0), Some(Duration::from_secs(1)));
//! assert_eq!(backoff.next_delay(2), Some(Duration::from_secs(4)));
//! ```

mod exponential;
mod strategy;

pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use strategy::BackoffStrategy;
