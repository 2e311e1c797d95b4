//! Main client implementation

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::batch::batch_fetch;
use crate::catalog::{ResourceCatalog, encode_path_value};
use crate::config::{ClientConfig, ClientConfigBuilder, RateLimitConfig};
use crate::error::{ApiError, ConfigResult};
use crate::http::{HttpTransport, RequestDescriptor, RequestExecutor, ReqwestTransport};
use crate::outcome::Outcome;
use crate::pagination::{PageFetcher, PageResponse, Paginator};

/// Client for an organization-scoped REST API.
///
/// Cheap to clone; clones share the configuration, transport and catalog.
///
/// # Example
///
/// ```rust,no_run
/// use orgapi::Client;
/// use serde_json::Value;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .organization("acme")
///     .token("secret")
///     .build()?;
///
/// let members = client.get_all::<Value>("members", None).await;
/// match members.into_result() {
///     Ok(Some(members)) => println!("{} members", members.len()),
///     Ok(None) => println!("no content"),
///     Err(error) => eprintln!("{error}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    executor: RequestExecutor,
    catalog: ResourceCatalog,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("executor", &self.inner.executor)
            .field("resources", &self.inner.catalog.resources().collect::<Vec<_>>())
            .finish()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from a configuration object using the default
    /// `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn from_config(config: ClientConfig) -> ConfigResult<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Create a client that sends requests through `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> ConfigResult<Self> {
        Self::assemble(config, transport, ResourceCatalog::new())
    }

    fn assemble(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        catalog: ResourceCatalog,
    ) -> ConfigResult<Self> {
        let executor = RequestExecutor::new(transport, Arc::new(config))?;
        Ok(Self {
            inner: Arc::new(ClientInner { executor, catalog }),
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        self.inner.executor.config()
    }

    /// The underlying request executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.inner.executor
    }

    /// The resource catalog used by [`Client::call`].
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.inner.catalog
    }

    /// Pagination settings derived from the configuration.
    pub fn paginator(&self) -> Paginator {
        Paginator::from_config(self.config())
    }

    /// Execute an arbitrary request descriptor.
    pub async fn execute<T>(&self, descriptor: &RequestDescriptor) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        self.inner.executor.execute(descriptor).await
    }

    /// GET `path` with optional query parameters.
    pub async fn get<T>(&self, path: &str, params: Option<Value>) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let mut descriptor = RequestDescriptor::get(path);
        descriptor.params = params;
        self.execute(&descriptor).await
    }

    /// POST a JSON body to `path`.
    pub async fn post<T>(&self, path: &str, body: Value) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        self.execute(&RequestDescriptor::post(path, body)).await
    }

    /// PUT a JSON body to `path`.
    pub async fn put<T>(&self, path: &str, body: Value) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        self.execute(&RequestDescriptor::put(path, body)).await
    }

    /// PATCH a JSON body to `path`.
    pub async fn patch<T>(&self, path: &str, body: Value) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        self.execute(&RequestDescriptor::patch(path, body)).await
    }

    /// DELETE `path`.
    pub async fn delete<T>(&self, path: &str) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        self.execute(&RequestDescriptor::delete(path)).await
    }

    /// Lazily stream every item of a collection endpoint.
    ///
    /// `offset` and `limit` are added to `params` for every page.
    pub fn paginate<T>(&self, path: &str, params: Option<Value>) -> impl Stream<Item = Result<T, ApiError>> + use<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginator().stream(self.pages(path, params))
    }

    /// Fetch every item of a collection endpoint, several pages at a time.
    pub async fn get_all<T>(&self, path: &str, params: Option<Value>) -> Outcome<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginator().collect_all(self.pages(path, params)).await
    }

    /// Fetch `{path}/{id}` for every id, `parallel_limit` at a time.
    ///
    /// Fails with an `Aggregate` error listing every failed id when any
    /// fetch fails.
    pub async fn batch_get<T, I>(&self, path: &str, ids: Vec<I>) -> Outcome<Vec<T>>
    where
        T: DeserializeOwned,
        I: fmt::Display,
    {
        let base = path.trim_end_matches('/');
        batch_fetch(
            ids,
            |id| {
                let descriptor =
                    RequestDescriptor::get(format!("{base}/{}", encode_path_value(&id.to_string())));
                async move { self.execute(&descriptor).await }
            },
            self.config().parallel_limit,
        )
        .await
    }

    /// Invoke a catalog operation and return the raw JSON body.
    ///
    /// Unknown resources or operations and missing path parameters are
    /// reported as `Generic` errors without touching the network.
    pub async fn call(
        &self,
        resource: &str,
        operation: &str,
        path_params: Option<Value>,
        params: Option<Value>,
    ) -> Outcome<Value> {
        self.call_as(resource, operation, path_params, params).await
    }

    /// Invoke a catalog operation and deserialize the body into `T`.
    pub async fn call_as<T>(
        &self,
        resource: &str,
        operation: &str,
        path_params: Option<Value>,
        params: Option<Value>,
    ) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let descriptor = match self
            .inner
            .catalog
            .resolve(resource, operation)
            .and_then(|spec| spec.descriptor(path_params.as_ref(), params))
        {
            Ok(descriptor) => descriptor,
            Err(error) => return Outcome::Error(error),
        };

        self.execute(&descriptor).await
    }

    fn pages<T>(&self, path: &str, params: Option<Value>) -> EndpointPages<T> {
        EndpointPages {
            executor: self.inner.executor.clone(),
            path: path.to_string(),
            params,
            _marker: PhantomData,
        }
    }
}

/// Page fetcher for a collection endpoint.
struct EndpointPages<T> {
    executor: RequestExecutor,
    path: String,
    params: Option<Value>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PageFetcher<T> for EndpointPages<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Future = BoxFuture<'static, Outcome<PageResponse<T>>>;

    fn fetch_page(&self, offset: u64, limit: u64) -> Self::Future {
        let executor = self.executor.clone();
        let descriptor =
            RequestDescriptor::get(self.path.clone()).with_params(page_params(self.params.as_ref(), offset, limit));

        async move { executor.execute(&descriptor).await }.boxed()
    }
}

/// Merge `offset`/`limit` into the caller's query parameters.
fn page_params(params: Option<&Value>, offset: u64, limit: u64) -> Value {
    let mut merged = match params {
        Some(Value::Object(object)) => object.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            warn!(params = %other, "Ignoring non-object pagination parameters");
            Map::new()
        }
    };
    merged.insert("offset".to_string(), Value::from(offset));
    merged.insert("limit".to_string(), Value::from(limit));
    Value::Object(merged)
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    catalog: ResourceCatalog,
}

impl ClientBuilder {
    /// Start from an existing configuration, replacing earlier settings.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = ClientConfigBuilder::from_config(config);
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.base_url(base_url);
        self
    }

    /// Set the organization segment.
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.config = self.config.organization(organization);
        self
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config = self.config.token(token);
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config = self.config.max_retries(max_retries);
        self
    }

    /// Set the fan-out width of pagination and batch operations.
    pub fn parallel_limit(mut self, parallel_limit: usize) -> Self {
        self.config = self.config.parallel_limit(parallel_limit);
        self
    }

    /// Set the page size used by [`Client::paginate`] and [`Client::get_all`].
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.config = self.config.page_size(page_size);
        self
    }

    /// Enable or disable request body validation.
    pub fn validate_requests(mut self, enabled: bool) -> Self {
        self.config = self.config.validate_requests(enabled);
        self
    }

    /// Enable or disable response body validation.
    pub fn validate_responses(mut self, enabled: bool) -> Self {
        self.config = self.config.validate_responses(enabled);
        self
    }

    /// Set the first backoff delay.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.retry_base_delay(delay);
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
        self.config = self.config.default_header(key, value)?;
        Ok(self)
    }

    /// Throttle requests on the client side.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config = self.config.rate_limit(config);
        self
    }

    /// Send requests through a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resource operations available through [`Client::call`].
    pub fn catalog(mut self, catalog: ResourceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the default
    /// HTTP client cannot be created.
    pub fn build(self) -> ConfigResult<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        Client::assemble(self.config.build(), transport, self.catalog)
    }
}
