#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Runtime building blocks shared by the orgapi client.
//!
//! This crate holds the pieces of the request pipeline that know nothing
//! about HTTP or the API's error taxonomy:
//!
//! - **Retry strategies** via the [`BackoffStrategy`](retry::BackoffStrategy) trait
//!   - Exponential backoff (1s, 2s, 4s, ... by default)
//!   - A delay cap and a configurable growth factor
//! - **Bounded concurrency** via [`run_in_waves`](concurrency::run_in_waves),
//!   which executes work in sequential waves of at most N concurrent futures
//!
//! # Examples
//!
//! ```rust
//! use orgapi_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let backoff = ExponentialBackoff::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//! assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(400)));
//!
//! let doubled = run_in_waves(vec![1, 2, 3], 2, |n| async move { n * 2 }).await;
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # }
//! ```

pub mod concurrency;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use orgapi_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::concurrency::{chunk_count, run_in_waves, try_run_in_waves};
    pub use crate::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};
}
