//! Structured logging for the request pipeline
//!
//! The executor, the pagination engine and the batch combinator log through
//! these helpers so field names stay the same everywhere: `method`, `url`,
//! `attempt`, `status`, `correlation_id`, `elapsed_ms`.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::outcome::Outcome;

/// The fields shared by every log line of one call.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// Verb, upper case
    pub method: &'static str,
    /// Request URL including the query string
    pub url: String,
    /// Id sent as `x-correlation-id` on every attempt
    pub correlation_id: String,
    /// Serialized body length, if a body is sent
    pub body_bytes: Option<usize>,
}

impl RequestMetadata {
    /// Describe a call.
    pub fn new(method: &'static str, url: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            correlation_id: correlation_id.into(),
            body_bytes: None,
        }
    }

    /// Record the body length.
    pub fn with_body(mut self, body: Option<&[u8]>) -> Self {
        self.body_bytes = body.map(<[u8]>::len);
        self
    }

    /// An attempt is about to be sent.
    pub fn log_attempt(&self, attempt: u32) {
        debug!(
            method = self.method,
            url = %self.url,
            correlation_id = %self.correlation_id,
            attempt,
            body_bytes = self.body_bytes,
            "Sending request"
        );
    }

    /// Attempt `attempt` failed with `error`; the next one starts after `delay`.
    pub fn log_retry(&self, attempt: u32, delay: Duration, error: &ApiError) {
        warn!(
            method = self.method,
            url = %self.url,
            correlation_id = %self.correlation_id,
            attempt,
            status = error.status_code(),
            kind = %error.kind(),
            delay_ms = delay.as_millis(),
            "Retrying request"
        );
    }
}

/// How a call ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    /// Final status: the response status, 204 for `Empty`, or the error's
    /// status (`0` without a response)
    pub status: u16,
    /// Wall time of the call, backoff included
    pub elapsed: Duration,
    /// Attempts made, at least one
    pub attempts: u32,
}

impl ResponseMetadata {
    /// Summarize a finished call.
    pub fn from_outcome<T>(outcome: &Outcome<T>, elapsed: Duration, attempts: u32) -> Self {
        let status = match outcome {
            Outcome::Data(_) => 200,
            Outcome::Empty => 204,
            Outcome::Error(error) => error.status_code(),
        };
        Self {
            status,
            elapsed,
            attempts,
        }
    }

    /// Log the call at `info` on success, `warn` on failure.
    pub fn log<T>(&self, request: &RequestMetadata, outcome: &Outcome<T>) {
        match outcome.error() {
            Some(error) => self.log_error(request, error),
            None => self.log_success(request),
        }
    }

    fn log_success(&self, request: &RequestMetadata) {
        info!(
            method = request.method,
            url = %request.url,
            correlation_id = %request.correlation_id,
            status = self.status,
            attempts = self.attempts,
            elapsed_ms = self.elapsed.as_millis(),
            "Request completed"
        );
    }

    fn log_error(&self, request: &RequestMetadata, error: &ApiError) {
        warn!(
            method = request.method,
            url = %request.url,
            correlation_id = %request.correlation_id,
            status = self.status,
            kind = %error.kind(),
            attempts = self.attempts,
            elapsed_ms = self.elapsed.as_millis(),
            error = %error.message(),
            "Request failed"
        );
    }
}

/// Wall-clock stopwatch started at construction.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer(Instant);

impl RequestTimer {
    /// Start timing.
    pub fn start() -> Self {
        Self(Instant::now())
    }

    /// Time since [`RequestTimer::start`].
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// A page came back from the pagination engine.
pub fn log_page(offset: u64, limit: u64, items: usize, total: Option<u64>) {
    debug!(offset, limit, items, total, "Fetched page");
}

/// A fan-out operation finished.
pub fn log_fan_out(operation: &str, succeeded: usize, failed: usize) {
    if failed == 0 {
        debug!(operation, succeeded, "Fan-out finished");
    } else {
        warn!(operation, succeeded, failed, "Fan-out finished with failures");
    }
}

/// Install a `tracing-subscriber` formatter honoring `RUST_LOG`
/// (default `orgapi=info`). Later calls are no-ops.
#[cfg(feature = "trace")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orgapi=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
