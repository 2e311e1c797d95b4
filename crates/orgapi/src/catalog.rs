//! Declarative resource table
//!
//! Resource operations are data, not code: each `(resource, operation)` pair
//! maps to an [`EndpointSpec`] holding the verb, a path template such as
//! `members/{id}` and optional schemas. [`Client::call`](crate::Client::call)
//! resolves the endpoint, renders the path and hands the result to the executor.
//!
//! # Examples
//!
//! ```rust
//! use orgapi::catalog::{EndpointSpec, ResourceCatalog};
//! use serde_json::json;
//!
//! let catalog = ResourceCatalog::new()
//!     .with_endpoint("members", "list", EndpointSpec::get("members"))
//!     .with_endpoint("members", "get", EndpointSpec::get("members/{id}"));
//!
//! let spec = catalog.resolve("members", "get").unwrap();
//! let descriptor = spec.descriptor(Some(&json!({"id": 42})), None).unwrap();
//! assert_eq!(descriptor.path, "members/42");
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::http::{Method, RequestDescriptor};
use crate::validation::Schema;

/// Everything but RFC 3986 unreserved characters is escaped in a path value.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// One operation of a resource.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    /// HTTP verb
    pub method: Method,
    /// Path below the organization API root, with `{name}` placeholders
    pub path_template: String,
    /// Schema for request bodies
    pub request_schema: Option<Arc<dyn Schema>>,
    /// Schema for successful response bodies
    pub response_schema: Option<Arc<dyn Schema>>,
}

impl EndpointSpec {
    /// Spec for `method` on `path_template`.
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            request_schema: None,
            response_schema: None,
        }
    }

    /// GET endpoint.
    pub fn get(path_template: impl Into<String>) -> Self {
        Self::new(Method::Get, path_template)
    }

    /// POST endpoint.
    pub fn post(path_template: impl Into<String>) -> Self {
        Self::new(Method::Post, path_template)
    }

    /// PUT endpoint.
    pub fn put(path_template: impl Into<String>) -> Self {
        Self::new(Method::Put, path_template)
    }

    /// PATCH endpoint.
    pub fn patch(path_template: impl Into<String>) -> Self {
        Self::new(Method::Patch, path_template)
    }

    /// DELETE endpoint.
    pub fn delete(path_template: impl Into<String>) -> Self {
        Self::new(Method::Delete, path_template)
    }

    /// Attach a request schema.
    pub fn with_request_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.request_schema = Some(schema);
        self
    }

    /// Attach a response schema.
    pub fn with_response_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Build the request descriptor for one call.
    ///
    /// # Errors
    ///
    /// Returns a `Generic` error (status 0) when a placeholder has no value.
    pub fn descriptor(
        &self,
        path_params: Option<&Value>,
        params: Option<Value>,
    ) -> Result<RequestDescriptor, ApiError> {
        let mut descriptor =
            RequestDescriptor::new(self.method, render_path(&self.path_template, path_params)?);
        descriptor.params = params;
        descriptor.request_schema = self.request_schema.clone();
        descriptor.response_schema = self.response_schema.clone();
        Ok(descriptor)
    }
}

/// `{resource: {operation: EndpointSpec}}`
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: BTreeMap<String, BTreeMap<String, EndpointSpec>>,
}

impl ResourceCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation, builder style.
    pub fn with_endpoint(
        mut self,
        resource: impl Into<String>,
        operation: impl Into<String>,
        spec: EndpointSpec,
    ) -> Self {
        self.insert(resource, operation, spec);
        self
    }

    /// Add or replace an operation.
    pub fn insert(
        &mut self,
        resource: impl Into<String>,
        operation: impl Into<String>,
        spec: EndpointSpec,
    ) -> Option<EndpointSpec> {
        self.resources
            .entry(resource.into())
            .or_default()
            .insert(operation.into(), spec)
    }

    /// Look up an operation.
    pub fn endpoint(&self, resource: &str, operation: &str) -> Option<&EndpointSpec> {
        self.resources.get(resource)?.get(operation)
    }

    /// Look up an operation, reporting unknown names as a `Generic` error.
    pub fn resolve(&self, resource: &str, operation: &str) -> Result<&EndpointSpec, ApiError> {
        let operations = self
            .resources
            .get(resource)
            .ok_or_else(|| ApiError::generic(0, format!("Unknown resource '{resource}'")))?;
        operations.get(operation).ok_or_else(|| {
            ApiError::generic(0, format!("Unknown operation '{operation}' on resource '{resource}'"))
        })
    }

    /// Registered resource names, sorted.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Operation names of `resource`, sorted.
    pub fn operations(&self, resource: &str) -> impl Iterator<Item = &str> {
        self.resources
            .get(resource)
            .into_iter()
            .flat_map(|operations| operations.keys().map(String::as_str))
    }

    /// `true` when no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(BTreeMap::is_empty)
    }
}

/// Substitute `{name}` placeholders with percent-encoded values.
///
/// String values are used verbatim, numbers and booleans are stringified.
/// A missing, null or compound value is an error.
pub fn render_path(template: &str, path_params: Option<&Value>) -> Result<String, ApiError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ApiError::generic(0, format!("Unclosed placeholder in path template '{template}'"))
        })?;

        let name = &after[..end];
        let value = path_params
            .and_then(|params| params.get(name))
            .and_then(path_value)
            .ok_or_else(|| {
                ApiError::generic(0, format!("Missing path parameter '{name}' for '{template}'"))
            })?;

        rendered.push_str(&encode_path_value(&value));
        rest = &after[end + 1..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Percent-encode a single path segment.
pub(crate) fn encode_path_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_VALUE).to_string()
}

fn path_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
