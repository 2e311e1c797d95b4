//! Schema validation adapter
//!
//! Schemas are opaque validators with a single contract: `parse` either
//! returns the (possibly normalized) data or the list of issues that made
//! it invalid. The adapter in this module turns that contract into an
//! [`Outcome`], so a rejected body becomes a `SchemaValidation` error
//! instead of a panic or a bare `Err`.
//!
//! # Examples
//!
//! ```rust
//! use orgapi::validation::{validate, RequiredFields};
//! use serde_json::json;
//!
//! let schema = RequiredFields::new(["name", "email"]);
//!
//! assert!(validate(&schema, &json!({"name": "a", "email": "b"})).is_data());
//! assert!(validate(&schema, &json!({"name": "a"})).is_error());
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::debug;

use crate::error::ApiError;
use crate::outcome::Outcome;

/// One problem found by a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the offending value (`""` for the root)
    pub path: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// The failure side of [`Schema::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation issue(s)", .0.len())]
pub struct ValidationIssues(pub Vec<ValidationIssue>);

impl ValidationIssues {
    /// A single issue.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![ValidationIssue::new(path, message)])
    }
}

/// A request or response body validator.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str {
        "schema"
    }

    /// Validate `data`, returning the accepted value.
    fn parse(&self, data: &Value) -> Result<Value, ValidationIssues>;
}

/// Run `data` through `schema`.
///
/// Returns `Data` with the parsed value, or a `SchemaValidation` error.
pub fn validate(schema: &dyn Schema, data: &Value) -> Outcome<Value> {
    match schema.parse(data) {
        Ok(parsed) => Outcome::Data(parsed),
        Err(ValidationIssues(issues)) => {
            debug!(schema = schema.name(), issues = issues.len(), "Schema rejected data");
            Outcome::Error(ApiError::schema_validation(issues))
        }
    }
}

/// Deserialize a body into the caller's type.
///
/// A mismatch is reported the same way as a schema rejection.
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::schema_validation(vec![ValidationIssue::new("", e.to_string())]))
}

/// Accepts data iff it deserializes into `T`; returns it re-serialized.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Create a schema for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    fn name(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn parse(&self, data: &Value) -> Result<Value, ValidationIssues> {
        let typed: T = serde_json::from_value(data.clone())
            .map_err(|e| ValidationIssues::single("", e.to_string()))?;
        serde_json::to_value(typed).map_err(|e| ValidationIssues::single("", e.to_string()))
    }
}

/// A schema backed by a closure.
pub struct FnSchema<F> {
    name: String,
    parse: F,
}

impl<F> FnSchema<F>
where
    F: Fn(&Value) -> Result<Value, ValidationIssues> + Send + Sync,
{
    /// Wrap `parse` under `name`.
    pub fn new(name: impl Into<String>, parse: F) -> Self {
        Self {
            name: name.into(),
            parse,
        }
    }
}

impl<F> fmt::Debug for FnSchema<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").field("name", &self.name).finish()
    }
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(&Value) -> Result<Value, ValidationIssues> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, data: &Value) -> Result<Value, ValidationIssues> {
        (self.parse)(data)
    }
}

/// Requires an object with non-null values for every listed field.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    /// Require `fields`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Schema for RequiredFields {
    fn name(&self) -> &str {
        "required_fields"
    }

    fn parse(&self, data: &Value) -> Result<Value, ValidationIssues> {
        let Some(object) = data.as_object() else {
            return Err(ValidationIssues::single("", "expected an object"));
        };

        let issues: Vec<ValidationIssue> = self
            .fields
            .iter()
            .filter(|field| object.get(field.as_str()).is_none_or(Value::is_null))
            .map(|field| ValidationIssue::new(field.clone(), "required"))
            .collect();

        if issues.is_empty() {
            Ok(data.clone())
        } else {
            Err(ValidationIssues(issues))
        }
    }
}
