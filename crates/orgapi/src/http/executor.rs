//! The request executor
//!
//! Turns a [`RequestDescriptor`] into a resilient HTTP exchange:
//!
//! 1. URL construction (`{base}/{organization}/api/{path}` plus query)
//! 2. Optional request body validation, before any network access
//! 3. Auth, correlation and JSON headers
//! 4. Attempts under a timeout, sequential, at most `max_retries + 1`
//! 5. Status classification and optional response validation
//!
//! Nothing escapes as a panic or `Err`: every path ends in an [`Outcome`].

use bytes::Bytes;
use governor::DefaultDirectRateLimiter;
use http::{HeaderMap, HeaderName, HeaderValue, header};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::CORRELATION_ID_HEADER;
use super::request::{RequestDescriptor, build_url};
use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigResult, ErrorBody};
use crate::observability::{RequestMetadata, RequestTimer, ResponseMetadata};
use crate::outcome::Outcome;
use crate::validation::{deserialize_value, validate};

/// Result of a single attempt, before the retry decision.
enum Attempt {
    Done(Outcome<Value>),
    Retry { error: ApiError, delay: Duration },
}

/// Executes requests against one configured API.
///
/// Cheap to clone; clones share the transport and the rate limiter.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    base_url: Url,
    retry: RetryPolicy,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &self.transport.name())
            .field("base_url", &self.base_url.as_str())
            .field("organization", &self.config.organization())
            .field("retry", &self.retry)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl RequestExecutor {
    /// Build an executor over `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails [`ClientConfig::validate`].
    pub fn new(transport: Arc<dyn HttpTransport>, config: Arc<ClientConfig>) -> ConfigResult<Self> {
        let base_url = config.validate()?;
        let retry = RetryPolicy::new(config.max_retries, config.retry_base_delay);
        let limiter = config
            .rate_limit
            .as_ref()
            .map(|rate_limit| Arc::new(rate_limit.limiter()));

        Ok(Self {
            transport,
            config,
            base_url,
            retry,
            limiter,
        })
    }

    /// The configuration this executor was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The default retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Execute `descriptor` and deserialize the body into `T`.
    ///
    /// A body that does not fit `T` is reported as a `SchemaValidation`
    /// error.
    pub async fn execute<T>(&self, descriptor: &RequestDescriptor) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let correlation_id = Uuid::new_v4().to_string();

        self.exchange(descriptor, &correlation_id)
            .await
            .and_then(|value| Outcome::from(deserialize_value::<T>(value)))
            .map_error(|error| attach_correlation_id(error, &correlation_id))
    }

    /// Execute `descriptor` and return the raw JSON body.
    pub async fn execute_value(&self, descriptor: &RequestDescriptor) -> Outcome<Value> {
        self.execute(descriptor).await
    }

    async fn exchange(&self, descriptor: &RequestDescriptor, correlation_id: &str) -> Outcome<Value> {
        if descriptor.path.trim_matches('/').is_empty() {
            return Outcome::Error(ApiError::generic(0, "Endpoint path must not be empty"));
        }

        let url = match build_url(
            &self.base_url,
            self.config.organization(),
            &descriptor.path,
            descriptor.method,
            descriptor.params.as_ref(),
        ) {
            Ok(url) => url,
            Err(error) => return Outcome::Error(error),
        };

        let body = match self.prepare_body(descriptor) {
            Ok(body) => body,
            Err(error) => return Outcome::Error(error),
        };

        let headers = match self.build_headers(correlation_id) {
            Ok(headers) => headers,
            Err(error) => return Outcome::Error(error),
        };

        let metadata = RequestMetadata::new(descriptor.method.as_str(), url.as_str(), correlation_id)
            .with_body(body.as_deref());

        let request = HttpRequest {
            method: descriptor.method.into(),
            url,
            headers,
            body,
        };

        let retry = match descriptor.max_retries {
            Some(max_retries) => self.retry.with_max_retries(max_retries),
            None => self.retry.clone(),
        };
        let timeout = descriptor.timeout.unwrap_or(self.config.timeout);

        self.run_attempts(descriptor, request, &retry, timeout, &metadata)
            .await
    }

    /// Serialize the body, running it through the request schema first.
    fn prepare_body(&self, descriptor: &RequestDescriptor) -> Result<Option<Bytes>, ApiError> {
        if !descriptor.method.has_body() {
            return Ok(None);
        }
        let Some(params) = &descriptor.params else {
            return Ok(None);
        };

        let body = match &descriptor.request_schema {
            Some(schema) if self.config.validate_requests => match validate(schema.as_ref(), params) {
                Outcome::Data(parsed) => parsed,
                Outcome::Error(error) => return Err(error),
                Outcome::Empty => params.clone(),
            },
            _ => params.clone(),
        };

        serde_json::to_vec(&body)
            .map(|bytes| Some(Bytes::from(bytes)))
            .map_err(|e| ApiError::generic(0, format!("Failed to serialize request body: {e}")))
    }

    fn build_headers(&self, correlation_id: &str) -> Result<HeaderMap, ApiError> {
        let mut headers = self.config.default_headers.clone();

        let token = self
            .config
            .token
            .as_ref()
            .map(|token| token.expose_secret())
            .unwrap_or_default();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::generic(0, "Bearer token is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let correlation = HeaderValue::from_str(correlation_id)
            .map_err(|_| ApiError::generic(0, "Correlation id is not a valid header value"))?;
        headers.insert(HeaderName::from_static(CORRELATION_ID_HEADER), correlation);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    async fn run_attempts(
        &self,
        descriptor: &RequestDescriptor,
        request: HttpRequest,
        retry: &RetryPolicy,
        timeout: Duration,
        metadata: &RequestMetadata,
    ) -> Outcome<Value> {
        let timer = RequestTimer::start();
        let total_attempts = retry.total_attempts();
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            metadata.log_attempt(attempt);
            let is_last = attempt + 1 >= total_attempts;

            let step = match tokio::time::timeout(timeout, self.transport.send(request.clone())).await
            {
                Ok(Ok(response)) => self.handle_response(descriptor, response, attempt, is_last, retry),
                Ok(Err(TransportError::Timeout)) | Err(_) => {
                    if is_last {
                        Attempt::Done(Outcome::Error(ApiError::timeout()))
                    } else {
                        Attempt::Retry {
                            error: ApiError::timeout(),
                            delay: retry.backoff_delay(attempt),
                        }
                    }
                }
                Ok(Err(error)) => Attempt::Done(Outcome::Error(ApiError::fetch(error))),
            };

            match step {
                Attempt::Done(outcome) => {
                    ResponseMetadata::from_outcome(&outcome, timer.elapsed(), attempt + 1)
                        .log(metadata, &outcome);
                    return outcome;
                }
                Attempt::Retry { error, delay } => {
                    metadata.log_retry(attempt, delay, &error);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn handle_response(
        &self,
        descriptor: &RequestDescriptor,
        response: HttpResponse,
        attempt: u32,
        is_last: bool,
        retry: &RetryPolicy,
    ) -> Attempt {
        let status = response.status();

        if response.is_success() {
            return Attempt::Done(self.handle_success(descriptor, &response));
        }

        let error = ApiError::from_status(
            status,
            response.headers(),
            capture_error_body(&response),
            retry.backoff_delay(attempt),
        );

        if !is_last && retry.should_retry_status(status) {
            let delay = retry.delay_for(attempt, &error);
            Attempt::Retry { error, delay }
        } else {
            Attempt::Done(Outcome::Error(error))
        }
    }

    fn handle_success(&self, descriptor: &RequestDescriptor, response: &HttpResponse) -> Outcome<Value> {
        let status = response.status();
        if status == 204 {
            return Outcome::Empty;
        }

        let bytes = match response.bytes() {
            Ok(bytes) => bytes,
            Err(error) => return Outcome::Error(ApiError::fetch(error)),
        };

        let data: Value = match serde_json::from_slice(bytes) {
            Ok(data) => data,
            Err(e) => {
                return Outcome::Error(ApiError::generic(
                    status,
                    format!("Failed to parse response body as JSON: {e}"),
                ));
            }
        };

        match &descriptor.response_schema {
            Some(schema) if self.config.validate_responses => validate(schema.as_ref(), &data),
            _ => Outcome::Data(data),
        }
    }
}

/// Best-effort capture of a failed response's body.
fn capture_error_body(response: &HttpResponse) -> Option<ErrorBody> {
    if response.is_json()
        && let Ok(json) = response.json()
    {
        return Some(ErrorBody::Json(json));
    }

    match response.text() {
        Ok(text) if !text.is_empty() => Some(ErrorBody::Text(text)),
        _ => None,
    }
}

fn attach_correlation_id(error: ApiError, correlation_id: &str) -> ApiError {
    if error.correlation_id().is_some() {
        error
    } else {
        error.with_correlation_id(correlation_id)
    }
}
