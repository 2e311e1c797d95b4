//! Request descriptors and URL construction

use derive_builder::Builder;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::ApiError;
use crate::validation::Schema;

/// HTTP verbs supported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET, parameters go to the query string
    #[default]
    Get,
    /// POST, parameters go to the JSON body
    Post,
    /// PUT, parameters go to the JSON body
    Put,
    /// PATCH, parameters go to the JSON body
    Patch,
    /// DELETE, parameters go to the query string
    Delete,
}

impl Method {
    /// Whether parameters are sent as a JSON body rather than a query string.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    /// Uppercase verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// One logical API call.
///
/// Built either with the shorthand constructors or with
/// [`RequestDescriptor::builder`].
///
/// # Example
///
/// ```rust
/// use orgapi::http::{Method, RequestDescriptor};
/// use serde_json::json;
///
/// let by_builder = RequestDescriptor::builder()
///     .path("members")
///     .method(Method::Post)
///     .params(json!({"name": "ada"}))
///     .build()
///     .unwrap();
///
/// let by_shorthand = RequestDescriptor::post("members", json!({"name": "ada"}));
/// assert_eq!(by_builder.path, by_shorthand.path);
/// ```
#[derive(Clone, Builder)]
pub struct RequestDescriptor {
    /// Endpoint path below `{base}/{organization}/api/`
    #[builder(setter(into))]
    pub path: String,

    /// HTTP verb
    #[builder(default)]
    pub method: Method,

    /// Query parameters (GET/DELETE) or JSON body (POST/PUT/PATCH)
    #[builder(default, setter(strip_option))]
    pub params: Option<Value>,

    /// Schema applied to the body before sending
    #[builder(default, setter(strip_option))]
    pub request_schema: Option<Arc<dyn Schema>>,

    /// Schema applied to successful response bodies
    #[builder(default, setter(strip_option))]
    pub response_schema: Option<Arc<dyn Schema>>,

    /// Per-call timeout overriding the client default
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,

    /// Per-call retry budget overriding the client default
    #[builder(default, setter(strip_option))]
    pub max_retries: Option<u32>,
}

impl RequestDescriptor {
    /// Create a new builder.
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    /// Descriptor for `method` on `path` without parameters.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            params: None,
            request_schema: None,
            response_schema: None,
            timeout: None,
            max_retries: None,
        }
    }

    /// GET `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST `body` to `path`.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_params(body)
    }

    /// PUT `body` to `path`.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_params(body)
    }

    /// PATCH `body` to `path`.
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_params(body)
    }

    /// DELETE `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Set the parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the request schema.
    pub fn with_request_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.request_schema = Some(schema);
        self
    }

    /// Set the response schema.
    pub fn with_response_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Override the timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry budget for this call.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("request_schema", &self.request_schema.as_ref().map(|s| s.name().to_string()))
            .field("response_schema", &self.response_schema.as_ref().map(|s| s.name().to_string()))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Build `{base}/{organization}/api/{path}`, adding query parameters for
/// bodyless verbs.
pub fn build_url(
    base_url: &Url,
    organization: &str,
    path: &str,
    method: Method,
    params: Option<&Value>,
) -> Result<Url, ApiError> {
    let raw = format!(
        "{}/{}/api/{}",
        base_url.as_str().trim_end_matches('/'),
        organization.trim_matches('/'),
        path.trim_start_matches('/'),
    );

    let mut url = Url::parse(&raw)
        .map_err(|e| ApiError::generic(0, format!("Invalid request URL '{raw}': {e}")))?;

    if !method.has_body()
        && let Some(params) = params
    {
        let pairs = query_pairs(params);
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
    }

    Ok(url)
}

/// Flatten a parameter object into query string pairs.
///
/// Null entries are skipped, strings are used verbatim, other scalars are
/// stringified and arrays/objects are JSON encoded. Non-object parameters
/// produce no pairs.
pub fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(object) = params.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}
