//! Bounded concurrency in sequential waves.
//!
//! Work is partitioned into consecutive chunks of at most `wave_size`
//! items. All futures of a chunk are polled concurrently on the current
//! task; the next chunk starts only after every future of the previous one
//! has completed. No threads are spawned.
//!
//! Inputs are consumed lazily, one wave at a time, so an iterator far
//! larger than memory (or unbounded) is fine as long as the caller stops
//! it, for example through the first error of [`try_run_in_waves`].

use futures::future::join_all;
use std::future::Future;

/// Number of waves needed to process `len` items `wave_size` at a time.
///
/// A `wave_size` of zero is treated as one.
///
/// ```rust
/// use orgapi_core::concurrency::chunk_count;
///
/// assert_eq!(chunk_count(7, 5), 2);
/// assert_eq!(chunk_count(0, 5), 0);
/// ```
pub fn chunk_count(len: usize, wave_size: usize) -> usize {
    len.div_ceil(wave_size.max(1))
}

/// Run `task` for every item, at most `wave_size` at a time.
///
/// Results are returned in input order regardless of the order in which
/// futures inside a wave complete. A `wave_size` of zero is treated as one.
///
/// ```rust
/// use orgapi_core::concurrency::run_in_waves;
///
/// # async fn example() {
/// let lengths = run_in_waves(vec!["a", "bb", "ccc"], 2, |s| async move { s.len() }).await;
/// assert_eq!(lengths, vec![1, 2, 3]);
/// # }
/// ```
pub async fn run_in_waves<Items, F, Fut>(items: Items, wave_size: usize, mut task: F) -> Vec<Fut::Output>
where
    Items: IntoIterator,
    F: FnMut(Items::Item) -> Fut,
    Fut: Future,
{
    let wave_size = wave_size.max(1);
    let mut results = Vec::new();
    let mut remaining = items.into_iter().peekable();

    while remaining.peek().is_some() {
        let wave: Vec<Fut> = remaining.by_ref().take(wave_size).map(&mut task).collect();
        #[cfg(feature = "tracing")]
        tracing::trace!(wave_len = wave.len(), "Starting concurrency wave");
        results.extend(join_all(wave).await);
    }

    results
}

/// Like [`run_in_waves`], but stops after the first wave that produced an
/// error.
///
/// Waves already started always run to completion; later waves are never
/// started. When a wave has several failures, the one belonging to the
/// earliest item is returned. On success the values are in input order.
///
/// ```rust
/// use orgapi_core::concurrency::try_run_in_waves;
///
/// # async fn example() {
/// let parsed = try_run_in_waves(vec!["1", "2", "x", "4"], 2, |s| async move {
///     s.parse::<u8>().map_err(|_| s)
/// })
/// .await;
/// assert_eq!(parsed, Err("x"));
/// # }
/// ```
pub async fn try_run_in_waves<Items, F, Fut, T, E>(
    items: Items,
    wave_size: usize,
    mut task: F,
) -> Result<Vec<T>, E>
where
    Items: IntoIterator,
    F: FnMut(Items::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let wave_size = wave_size.max(1);
    let mut results = Vec::new();
    let mut remaining = items.into_iter().peekable();

    while remaining.peek().is_some() {
        let wave: Vec<Fut> = remaining.by_ref().take(wave_size).map(&mut task).collect();
        #[cfg(feature = "tracing")]
        tracing::trace!(wave_len = wave.len(), "Starting fallible concurrency wave");
        for outcome in join_all(wave).await {
            results.push(outcome?);
        }
    }

    Ok(results)
}
