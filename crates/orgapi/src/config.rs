//! Configuration for the orgapi client

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use http::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::{
    DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE, DEFAULT_PARALLEL_LIMIT, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_TIMEOUT,
};

/// Configuration shared (read-only) by every request issued through a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://api.example.com`
    pub base_url: Option<String>,

    /// Organization segment inserted before `/api/`
    pub organization: Option<String>,

    /// Bearer token sent with every request
    pub token: Option<SecretString>,

    /// Per-attempt timeout
    pub timeout: Duration,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Concurrent fetches per wave for pagination and batch operations
    pub parallel_limit: usize,

    /// Page size used by the pagination helpers
    pub page_size: u64,

    /// Run request bodies through their schema before sending
    pub validate_requests: bool,

    /// Run response bodies through their schema after receiving
    pub validate_responses: bool,

    /// First backoff delay; doubles on every retry
    pub retry_base_delay: Duration,

    /// Custom headers to include with every request
    pub default_headers: HeaderMap,

    /// Client-side throttling
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            organization: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            parallel_limit: DEFAULT_PARALLEL_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            validate_requests: true,
            validate_responses: true,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            default_headers: HeaderMap::new(),
            rate_limit: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `ORGAPI_BASE_URL`
    /// - `ORGAPI_ORGANIZATION`
    /// - `ORGAPI_TOKEN`
    /// - `ORGAPI_TIMEOUT_MS` for the per-attempt timeout in milliseconds
    /// - `ORGAPI_MAX_RETRIES`
    /// - `ORGAPI_PARALLEL_LIMIT`
    /// - `ORGAPI_PAGE_SIZE`
    /// - `ORGAPI_VALIDATE_REQUESTS` / `ORGAPI_VALIDATE_RESPONSES` (`true`/`false`/`1`/`0`)
    ///
    /// Unset variables keep their defaults; unparseable ones are an error.
    #[cfg(feature = "env")]
    pub fn from_env() -> ConfigResult<Self> {
        use std::env;

        let mut config = Self::default();

        if let Ok(base_url) = env::var("ORGAPI_BASE_URL") {
            config.base_url = Some(base_url);
        }
        if let Ok(organization) = env::var("ORGAPI_ORGANIZATION") {
            config.organization = Some(organization);
        }
        if let Ok(token) = env::var("ORGAPI_TOKEN") {
            config.token = Some(SecretString::from(token));
        }

        if let Some(ms) = env_parsed::<u64>("ORGAPI_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(max_retries) = env_parsed::<u32>("ORGAPI_MAX_RETRIES")? {
            config.max_retries = max_retries;
        }
        if let Some(parallel_limit) = env_parsed::<usize>("ORGAPI_PARALLEL_LIMIT")? {
            config.parallel_limit = parallel_limit;
        }
        if let Some(page_size) = env_parsed::<u64>("ORGAPI_PAGE_SIZE")? {
            config.page_size = page_size;
        }
        if let Some(flag) = env_flag("ORGAPI_VALIDATE_REQUESTS")? {
            config.validate_requests = flag;
        }
        if let Some(flag) = env_flag("ORGAPI_VALIDATE_RESPONSES")? {
            config.validate_responses = flag;
        }

        Ok(config)
    }

    /// Load a `.env` file (if any) and then read the environment.
    #[cfg(feature = "env")]
    pub fn from_dotenv() -> ConfigResult<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::InvalidValue {
                name: ".env".to_string(),
                reason: e.to_string(),
            });
        }
        Self::from_env()
    }

    /// Check that the configuration can be used to issue requests.
    ///
    /// Returns the parsed base URL.
    pub fn validate(&self) -> ConfigResult<Url> {
        let raw = self
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing("base_url"))?;
        let base_url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{raw}: scheme must be http or https"
            )));
        }

        if self
            .organization
            .as_deref()
            .is_none_or(|org| org.trim_matches('/').is_empty())
        {
            return Err(ConfigError::Missing("organization"));
        }

        if self
            .token
            .as_ref()
            .is_none_or(|token| token.expose_secret().is_empty())
        {
            return Err(ConfigError::Missing("token"));
        }

        if self.parallel_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "parallel_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "page_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(base_url)
    }

    /// Organization segment without surrounding slashes.
    pub fn organization(&self) -> &str {
        self.organization
            .as_deref()
            .unwrap_or_default()
            .trim_matches('/')
    }
}

/// Token bucket throttling applied before every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,

    /// Requests allowed in a burst
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Build the limiter. Zero values are raised to one.
    pub fn limiter(&self) -> DefaultDirectRateLimiter {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Builder for creating [`ClientConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the organization segment.
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.config.organization = Some(organization.into());
        self
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the fan-out width of pagination and batch operations.
    pub fn parallel_limit(mut self, parallel_limit: usize) -> Self {
        self.config.parallel_limit = parallel_limit;
        self
    }

    /// Set the page size used by the pagination helpers.
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Enable or disable request body validation.
    pub fn validate_requests(mut self, enabled: bool) -> Self {
        self.config.validate_requests = enabled;
        self
    }

    /// Enable or disable response body validation.
    pub fn validate_responses(mut self, enabled: bool) -> Self {
        self.config.validate_responses = enabled;
        self
    }

    /// Set the first backoff delay.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    /// Add a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is not valid HTTP.
    pub fn default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ConfigResult<Self> {
        let key = key.into();
        let value = value.into();

        let name: HeaderName = key
            .parse()
            .map_err(|_| ConfigError::InvalidHeader(key.clone()))?;
        let value: HeaderValue = value
            .parse()
            .map_err(|_| ConfigError::InvalidHeader(format!("{key}: {value}")))?;

        self.config.default_headers.insert(name, value);
        Ok(self)
    }

    /// Enable rate limiting with default configuration.
    pub fn with_rate_limiting(mut self) -> Self {
        self.config.rate_limit = Some(RateLimitConfig::default());
        self
    }

    /// Set custom rate limiting configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(feature = "env")]
fn env_parsed<T>(name: &str) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(feature = "env")]
fn env_flag(name: &str) -> ConfigResult<Option<bool>> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            other => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
        Err(_) => Ok(None),
    }
}
