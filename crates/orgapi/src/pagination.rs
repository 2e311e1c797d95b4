//! Offset-based auto-pagination
//!
//! Two modes over the same page-fetch function:
//!
//! - [`Paginator::stream`]: a lazy, forward-only stream of items. A page is
//!   only requested once the consumer has drained the previous one, so
//!   dropping the stream stops pagination.
//! - [`Paginator::collect_all`]: eager aggregation. The first page reports
//!   the total count; the remaining pages are fetched in parallel waves of
//!   at most `parallel_limit` requests and concatenated in offset order.
//!
//! Neither mode retries on its own; retries belong to the executor.

use futures::{FutureExt, Stream, stream};
use orgapi_core::concurrency::try_run_in_waves;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::observability::log_page;
use crate::outcome::Outcome;
use crate::{DEFAULT_PAGE_SIZE, DEFAULT_PARALLEL_LIMIT};

/// One page of a collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    /// Total number of items across all pages, when reported
    #[serde(default, alias = "count", alias = "total_count")]
    pub total_count: Option<u64>,

    /// Offset of the first item of this page
    #[serde(default)]
    pub offset: u64,

    /// Requested page size
    #[serde(default)]
    pub limit: u64,

    /// Items of this page
    #[serde(default = "Vec::new", alias = "results")]
    pub items: Vec<T>,

    /// Indicator (URL or cursor) for the next page, `None` on the last one
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> PageResponse<T> {
    /// Whether the server indicated another page.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// A function fetching the page at `(offset, limit)`.
///
/// Implemented for every `Fn(u64, u64) -> impl Future<Output =
/// Outcome<PageResponse<T>>>`.
pub trait PageFetcher<T> {
    /// Future returned by [`PageFetcher::fetch_page`].
    type Future: Future<Output = Outcome<PageResponse<T>>>;

    /// Fetch `limit` items starting at `offset`.
    fn fetch_page(&self, offset: u64, limit: u64) -> Self::Future;
}

impl<T, F, Fut> PageFetcher<T> for F
where
    F: Fn(u64, u64) -> Fut,
    Fut: Future<Output = Outcome<PageResponse<T>>>,
{
    type Future = Fut;

    fn fetch_page(&self, offset: u64, limit: u64) -> Fut {
        self(offset, limit)
    }
}

/// Pagination settings.
///
/// # Examples
///
/// ```rust
/// use orgapi::pagination::{PageResponse, Paginator};
/// use orgapi::Outcome;
///
/// # async fn example() {
/// let data: Vec<u32> = (1..=5).collect();
/// let paginator = Paginator::new().with_page_size(2);
///
/// let all = paginator
///     .collect_all(|offset: u64, limit: u64| {
///         let data = data.clone();
///         async move {
///             let start = offset as usize;
///             let end = (start + limit as usize).min(data.len());
///             Outcome::Data(PageResponse {
///                 total_count: Some(data.len() as u64),
///                 offset,
///                 limit,
///                 items: data[start..end].to_vec(),
///                 next: (end < data.len()).then(|| "more".to_string()),
///             })
///         }
///     })
///     .await;
///
/// assert_eq!(all, Outcome::Data(vec![1, 2, 3, 4, 5]));
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u64,
    parallel_limit: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}

impl Paginator {
    /// Page size 100, five pages in flight.
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            parallel_limit: DEFAULT_PARALLEL_LIMIT,
        }
    }

    /// Settings taken from a client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            page_size: config.page_size,
            parallel_limit: config.parallel_limit,
        }
    }

    /// Set the page size. Zero is rejected when paginating.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the number of concurrent page fetches. Zero is treated as one.
    pub fn with_parallel_limit(mut self, parallel_limit: usize) -> Self {
        self.parallel_limit = parallel_limit;
        self
    }

    /// Configured page size.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Configured fan-out width.
    pub fn parallel_limit(&self) -> usize {
        self.parallel_limit
    }

    /// Fetch only the first page.
    pub async fn first_page<T, F>(&self, fetcher: F) -> Outcome<PageResponse<T>>
    where
        F: PageFetcher<T>,
    {
        if let Err(error) = self.check_page_size() {
            return Outcome::Error(error);
        }
        fetcher.fetch_page(0, self.page_size).await
    }

    /// Lazily stream every item, one page at a time.
    ///
    /// The stream ends after the last page (no `next` indicator) or after
    /// yielding the first error.
    pub fn stream<T, F>(&self, fetcher: F) -> impl Stream<Item = Result<T, ApiError>> + use<T, F>
    where
        F: PageFetcher<T>,
    {
        let state = LazyState {
            fetcher,
            page_size: self.page_size,
            offset: 0,
            buffer: VecDeque::new(),
            finished: false,
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Ok::<_, ApiError>(Some((item, state)));
                }
                if state.finished {
                    return Ok(None);
                }
                if state.page_size == 0 {
                    return Err(page_size_error());
                }

                let Some(page) = state
                    .fetcher
                    .fetch_page(state.offset, state.page_size)
                    .await
                    .into_result()?
                else {
                    state.finished = true;
                    continue;
                };

                log_page(state.offset, state.page_size, page.items.len(), page.total_count);
                state.finished = !page.has_more() || page.items.is_empty();
                state.offset += state.page_size;
                state.buffer.extend(page.items);
            }
        })
    }

    /// Eagerly fetch every page and concatenate the items in offset order.
    ///
    /// One request suffices when the first page covers the total count.
    /// Otherwise the remaining pages are fetched in waves of
    /// `parallel_limit`; the first failing page aborts the aggregation and
    /// no partial result is returned. The other pages of the failing wave
    /// still finish before the error is returned, and later waves are never
    /// started. When the server does not report a
    /// total, pages are followed sequentially through their `next`
    /// indicator.
    pub async fn collect_all<T, F>(&self, fetcher: F) -> Outcome<Vec<T>>
    where
        F: PageFetcher<T>,
    {
        self.collect_pages(&fetcher).await.into()
    }

    async fn collect_pages<T, F>(&self, fetcher: &F) -> Result<Vec<T>, ApiError>
    where
        F: PageFetcher<T>,
    {
        self.check_page_size()?;
        let limit = self.page_size;

        let Some(first) = fetcher.fetch_page(0, limit).await.into_result()? else {
            return Ok(Vec::new());
        };
        log_page(0, limit, first.items.len(), first.total_count);

        match first.total_count {
            Some(total) if total <= limit => Ok(first.items),
            Some(total) => self.fetch_remaining(fetcher, first.items, total).await,
            None => self.follow_next(fetcher, first).await,
        }
    }

    async fn fetch_remaining<T, F>(
        &self,
        fetcher: &F,
        mut items: Vec<T>,
        total: u64,
    ) -> Result<Vec<T>, ApiError>
    where
        F: PageFetcher<T>,
    {
        let limit = self.page_size;
        let pages_needed = total.div_ceil(limit);
        let offsets = (1..pages_needed).map(move |page| page * limit);

        let pages = try_run_in_waves(offsets, self.parallel_limit, |offset| {
            fetcher
                .fetch_page(offset, limit)
                .map(move |outcome| outcome.into_result().map(|page| (offset, page)))
        })
        .await?;

        for (offset, page) in pages {
            if let Some(page) = page {
                log_page(offset, limit, page.items.len(), page.total_count);
                items.extend(page.items);
            }
        }

        Ok(items)
    }

    async fn follow_next<T, F>(&self, fetcher: &F, first: PageResponse<T>) -> Result<Vec<T>, ApiError>
    where
        F: PageFetcher<T>,
    {
        let limit = self.page_size;
        let mut more = first.has_more() && !first.items.is_empty();
        let mut items = first.items;
        let mut offset = 0;

        while more {
            offset += limit;
            let Some(page) = fetcher.fetch_page(offset, limit).await.into_result()? else {
                break;
            };
            log_page(offset, limit, page.items.len(), page.total_count);
            more = page.has_more() && !page.items.is_empty();
            items.extend(page.items);
        }

        Ok(items)
    }

    fn check_page_size(&self) -> Result<(), ApiError> {
        if self.page_size == 0 {
            Err(page_size_error())
        } else {
            Ok(())
        }
    }
}

struct LazyState<T, F> {
    fetcher: F,
    page_size: u64,
    offset: u64,
    buffer: VecDeque<T>,
    finished: bool,
}

fn page_size_error() -> ApiError {
    ApiError::generic(0, "Page size must be greater than zero")
}
