//! Bounded-concurrency batch fetching
//!
//! Fetches many entities by key, at most `concurrency` at a time, and keeps
//! going when individual fetches fail. Successful items are returned only
//! when every key succeeded; otherwise all failures are bundled into one
//! `Aggregate` error.

use futures::FutureExt;
use orgapi_core::concurrency::run_in_waves;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use crate::error::ApiError;
use crate::observability::log_fan_out;
use crate::outcome::Outcome;

/// Fetch every key with `fetch_one`, `concurrency` keys per wave.
///
/// Waves run sequentially; inside a wave all fetches run concurrently and
/// every outcome is observed. `Data` results are kept in input-key order,
/// `Empty` results contribute nothing, and a fetch that panics counts as a
/// `Generic` error with status 0. A `concurrency` of zero is treated as
/// one.
///
/// Returns `Data(items)` when nothing failed and `Error(Aggregate)` with
/// every failure otherwise, discarding the successful items.
///
/// # Examples
///
/// ```rust
/// use orgapi::batch::batch_fetch;
/// use orgapi::{ApiError, Outcome};
///
/// # async fn example() {
/// let squares = batch_fetch(vec![1u32, 2, 3], |n| async move { Outcome::Data(n * n) }, 2).await;
/// assert_eq!(squares, Outcome::Data(vec![1, 4, 9]));
///
/// let failed = batch_fetch(
///     vec![1u32, 2],
///     |n| async move {
///         if n == 2 {
///             Outcome::Error(ApiError::generic(404, "missing"))
///         } else {
///             Outcome::Data(n)
///         }
///     },
///     5,
/// )
/// .await;
/// assert_eq!(failed.into_error().unwrap().children().len(), 1);
/// # }
/// ```
pub async fn batch_fetch<K, T, F, Fut>(keys: Vec<K>, fetch_one: F, concurrency: usize) -> Outcome<Vec<T>>
where
    F: Fn(K) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let outcomes = run_in_waves(keys, concurrency, |key| guarded(&fetch_one, key).map(|o| ((), o))).await;

    aggregate(outcomes).map(|pairs| pairs.into_iter().map(|((), item)| item).collect())
}

/// Like [`batch_fetch`], but pairs every item with the key it was fetched
/// for.
pub async fn batch_fetch_keyed<K, T, F, Fut>(
    keys: Vec<K>,
    fetch_one: F,
    concurrency: usize,
) -> Outcome<Vec<(K, T)>>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let outcomes = run_in_waves(keys, concurrency, |key| {
        guarded(&fetch_one, key.clone()).map(move |outcome| (key, outcome))
    })
    .await;

    aggregate(outcomes)
}

/// Call `fetch_one(key)` and turn a panic, either in the call itself or
/// while polling its future, into an error outcome.
fn guarded<K, T, F, Fut>(fetch_one: &F, key: K) -> impl Future<Output = Outcome<T>> + use<K, T, F, Fut>
where
    F: Fn(K) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let started = panic::catch_unwind(AssertUnwindSafe(|| fetch_one(key)));
    async move {
        match started {
            Ok(fetch) => AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Outcome::Error(panic_error(payload))),
            Err(payload) => Outcome::Error(panic_error(payload)),
        }
    }
}

fn aggregate<K, T>(outcomes: Vec<(K, Outcome<T>)>) -> Outcome<Vec<(K, T)>> {
    let mut items = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();

    for (key, outcome) in outcomes {
        match outcome {
            Outcome::Data(item) => items.push((key, item)),
            Outcome::Error(error) => errors.push(error),
            Outcome::Empty => {}
        }
    }

    log_fan_out("batch_fetch", items.len(), errors.len());

    match ApiError::aggregate(errors) {
        Some(aggregate) => Outcome::Error(aggregate),
        None => Outcome::Data(items),
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> ApiError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::fetch(format!("fetch panicked: {message}"))
}
