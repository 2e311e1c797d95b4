//! Error types for the orgapi client
//!
//! Every failure that crosses the public boundary of a core operation is an
//! [`ApiError`] carried inside an [`Outcome`](crate::Outcome). Instead of a
//! type per failure class, a single error type carries a closed
//! [`ErrorKind`] tag plus the kind-specific payload, so callers match on the
//! tag.
//!
//! Construction problems (bad base URL, missing token, ...) happen before any
//! request exists and are reported as [`ConfigError`] through a plain
//! `Result`.

use http::HeaderMap;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::validation::ValidationIssue;

/// Status codes that are retried with exponential backoff.
pub const RETRYABLE_STATUSES: [u16; 5] = [408, 500, 502, 503, 504];

/// Result type alias for client construction.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Failure class of an [`ApiError`].
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// 401 responses. Never retried.
    Authentication,

    /// 429 responses.
    RateLimit {
        /// Delay before the next attempt: the server's `retry-after` hint
        /// when present, otherwise the backoff delay for the attempt.
        retry_after: Duration,
    },

    /// 404 responses.
    NotFound,

    /// Any other 4xx response.
    Validation,

    /// 5xx responses.
    ServerError,

    /// A request or response body was rejected by a schema.
    SchemaValidation {
        /// Individual problems reported by the schema
        issues: Vec<ValidationIssue>,
    },

    /// Several failures collected from a fan-out operation. Never empty.
    Aggregate {
        /// The child errors in the order they were collected
        errors: Vec<ApiError>,
    },

    /// Transport failures, timeouts and unclassified statuses.
    Generic,
}

impl ErrorKind {
    /// Short, stable name of the kind, useful for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit { .. } => "rate_limit",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::ServerError => "server_error",
            ErrorKind::SchemaValidation { .. } => "schema_validation",
            ErrorKind::Aggregate { .. } => "aggregate",
            ErrorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Captured body of a failed response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The response declared a JSON content type and parsed as JSON.
    Json(Value),
    /// Any other body, read as text.
    Text(String),
}

impl ErrorBody {
    /// The body as JSON, if it was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ErrorBody::Json(value) => Some(value),
            ErrorBody::Text(_) => None,
        }
    }
}

/// The single error type returned by client operations.
///
/// Immutable once constructed. `status_code` is `0` for failures that never
/// produced an HTTP status (network errors, local validation before send).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error (status {status_code}): {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: u16,
    correlation_id: Option<String>,
    body: Option<ErrorBody>,
}

impl ApiError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
            correlation_id: None,
            body: None,
        }
    }

    /// A `Generic` error with an explicit status.
    pub fn generic(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, status_code, message)
    }

    /// A network-level failure (`Generic`, status 0).
    pub fn fetch(message: impl fmt::Display) -> Self {
        Self::generic(0, format!("Fetch error: {message}"))
    }

    /// Attempts exhausted on timeouts (`Generic`, status 408).
    pub fn timeout() -> Self {
        Self::generic(408, "Request timeout")
    }

    /// A local schema rejection (`SchemaValidation`, status 0).
    pub fn schema_validation(issues: Vec<ValidationIssue>) -> Self {
        let summary = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(
            ErrorKind::SchemaValidation { issues },
            0,
            format!("Schema validation failed: {summary}"),
        )
    }

    /// Bundle child errors from a fan-out operation.
    ///
    /// Returns `None` for an empty list, so an `Aggregate` always has at
    /// least one child. Status and correlation id mirror the first child.
    pub fn aggregate(errors: Vec<ApiError>) -> Option<Self> {
        let first = errors.first()?;
        let status_code = first.status_code;
        let correlation_id = first.correlation_id.clone();
        let message = format!("{} operation(s) failed; first: {}", errors.len(), first.message);

        Some(Self {
            kind: ErrorKind::Aggregate { errors },
            message,
            status_code,
            correlation_id,
            body: None,
        })
    }

    /// Classify a non-2xx HTTP response.
    ///
    /// First match wins: 401, 404, 429, other 4xx, 5xx, anything else.
    /// `fallback_retry_after` is used for 429 responses without a parseable
    /// `retry-after` header.
    pub fn from_status(
        status: u16,
        headers: &HeaderMap,
        body: Option<ErrorBody>,
        fallback_retry_after: Duration,
    ) -> Self {
        let (kind, default_message) = match status {
            401 => (ErrorKind::Authentication, "Authentication failed".to_string()),
            404 => (ErrorKind::NotFound, "Resource not found".to_string()),
            429 => (
                ErrorKind::RateLimit {
                    retry_after: parse_retry_after(headers).unwrap_or(fallback_retry_after),
                },
                "Rate limit exceeded".to_string(),
            ),
            400..=499 => (ErrorKind::Validation, "Validation error".to_string()),
            s if s >= 500 => (ErrorKind::ServerError, "Server error".to_string()),
            s => (ErrorKind::Generic, format!("HTTP error {s}")),
        };

        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or(default_message);

        Self {
            kind,
            message,
            status_code: status,
            correlation_id: None,
            body,
        }
    }

    /// Attach the correlation id of the request that produced this error.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attach a captured response body.
    pub fn with_body(mut self, body: ErrorBody) -> Self {
        self.body = Some(body);
        self
    }

    /// The failure class.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Human readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, or `0` when no response was received.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Correlation id sent with the failing request.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Captured response body, if any.
    pub fn body(&self) -> Option<&ErrorBody> {
        self.body.as_ref()
    }

    /// Child errors of an `Aggregate`, empty for every other kind.
    pub fn children(&self) -> &[ApiError] {
        match &self.kind {
            ErrorKind::Aggregate { errors } => errors,
            _ => &[],
        }
    }

    /// Schema issues of a `SchemaValidation` error, empty otherwise.
    pub fn issues(&self) -> &[ValidationIssue] {
        match &self.kind {
            ErrorKind::SchemaValidation { issues } => issues,
            _ => &[],
        }
    }

    /// Server-hinted (or derived) delay of a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ErrorKind::RateLimit { retry_after } => Some(retry_after),
            _ => None,
        }
    }

    /// Check if this error is retryable in kind.
    ///
    /// 401 and local schema failures never are.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::RateLimit { .. } => true,
            ErrorKind::Authentication
            | ErrorKind::SchemaValidation { .. }
            | ErrorKind::Aggregate { .. } => false,
            _ => RETRYABLE_STATUSES.contains(&self.status_code),
        }
    }

    /// Shorthand for matching on `ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }
}

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid base URL provided.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A numeric or boolean setting had an unusable value.
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid default header name or value.
    #[error("Invalid HTTP header: {0}")]
    InvalidHeader(String),

    /// HTTP client configuration or initialization error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Parse a `retry-after` header given as integer seconds.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull a readable message out of common error body shapes.
fn extract_message(body: &ErrorBody) -> Option<String> {
    match body {
        ErrorBody::Json(value) => ["message", "detail", "error"].iter().find_map(|key| {
            match value.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Object(inner) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from),
                _ => None,
            }
        }),
        ErrorBody::Text(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}
