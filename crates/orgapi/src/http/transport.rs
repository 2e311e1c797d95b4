//! Transport trait for abstracting the underlying HTTP call
//!
//! The executor never talks to a socket itself. It hands a fully built
//! [`HttpRequest`] to an [`HttpTransport`] and classifies whatever comes
//! back. [`ReqwestTransport`] is the default implementation; tests and
//! embedders can inject their own.

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// A fully built request, ready to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: http::Method,
    /// Target URL including the query string
    pub url: Url,
    /// Headers to send
    pub headers: HeaderMap,
    /// Serialized JSON body, if any
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Look up a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A response as returned by the transport.
///
/// The body is kept as a `Result` so a failed body read can be observed
/// without failing the exchange itself.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Result<Bytes, String>,
}

impl HttpResponse {
    /// Create a response with a fully read body.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: Ok(body.into()),
        }
    }

    /// Create a JSON response.
    pub fn json_body(status: u16, value: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self::new(status, headers, serde_json::to_vec(value).unwrap_or_default())
    }

    /// Create a response whose body could not be read.
    pub fn with_body_error(status: u16, headers: HeaderMap, error: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: Err(error.into()),
        }
    }

    /// Status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers (case-insensitive lookup).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` when the content type declares JSON.
    pub fn is_json(&self) -> bool {
        self.header(http::header::CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> Result<&Bytes, TransportError> {
        self.body
            .as_ref()
            .map_err(|e| TransportError::Body(e.clone()))
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_slice(self.bytes()?).map_err(|e| TransportError::Body(e.to_string()))
    }

    /// Body decoded as UTF-8 text (lossy).
    pub fn text(&self) -> Result<String, TransportError> {
        Ok(String::from_utf8_lossy(self.bytes()?).into_owned())
    }
}

/// Failures below the HTTP status level.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport gave up waiting.
    #[error("request timed out")]
    Timeout,

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Reading or decoding the body failed.
    #[error("body error: {0}")]
    Body(String),
}

/// The HTTP primitive the executor is built on.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Perform one HTTP exchange.
    ///
    /// Non-2xx statuses are not errors at this level; only failures that
    /// prevent a response from being received are.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Transport name for debugging/logging.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the SDK user agent.
    pub fn new() -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("orgapi-rust/{}", crate::VERSION))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        Ok(match response.bytes().await {
            Ok(body) => HttpResponse::new(status, headers, body),
            Err(e) => HttpResponse::with_body_error(status, headers, e.to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
