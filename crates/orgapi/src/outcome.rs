//! The three-state result returned by every public operation.
//!
//! No error escapes a core operation as a panic or a bare `Err`; callers
//! receive an [`Outcome`] and must look at the error slot before trusting
//! the data slot. `Empty` is a success (for example an HTTP 204) and is not
//! a failure.

use crate::error::ApiError;

/// Success with data, failure with an error, or success without content.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an Outcome may carry an error that should be inspected"]
pub enum Outcome<T> {
    /// Successful call that produced a value.
    Data(T),
    /// Failed call.
    Error(ApiError),
    /// Successful call without content.
    Empty,
}

impl<T> Outcome<T> {
    /// `true` for `Data`.
    pub fn is_data(&self) -> bool {
        matches!(self, Outcome::Data(_))
    }

    /// `true` for `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    /// `true` for `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// `true` for `Data` and `Empty`.
    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// Borrow the data slot.
    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Borrow the error slot.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Outcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Take the data slot.
    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Take the error slot.
    pub fn into_error(self) -> Option<ApiError> {
        match self {
            Outcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Split into the `(data, error)` pair view.
    pub fn into_parts(self) -> (Option<T>, Option<ApiError>) {
        match self {
            Outcome::Data(data) => (Some(data), None),
            Outcome::Error(error) => (None, Some(error)),
            Outcome::Empty => (None, None),
        }
    }

    /// Convert into a `Result` for use with `?`. `Empty` becomes `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            Outcome::Data(data) => Ok(Some(data)),
            Outcome::Error(error) => Err(error),
            Outcome::Empty => Ok(None),
        }
    }

    /// Build from a `Result` whose `Ok(None)` means "no content".
    pub fn from_optional(result: Result<Option<T>, ApiError>) -> Self {
        match result {
            Ok(Some(data)) => Outcome::Data(data),
            Ok(None) => Outcome::Empty,
            Err(error) => Outcome::Error(error),
        }
    }

    /// Transform the data slot.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Data(data) => Outcome::Data(f(data)),
            Outcome::Error(error) => Outcome::Error(error),
            Outcome::Empty => Outcome::Empty,
        }
    }

    /// Chain another fallible step onto the data slot.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Outcome::Data(data) => f(data),
            Outcome::Error(error) => Outcome::Error(error),
            Outcome::Empty => Outcome::Empty,
        }
    }

    /// Transform the error slot.
    pub fn map_error<F>(self, f: F) -> Outcome<T>
    where
        F: FnOnce(ApiError) -> ApiError,
    {
        match self {
            Outcome::Error(error) => Outcome::Error(f(error)),
            other => other,
        }
    }

    /// Replace `Empty` with a default value.
    pub fn unwrap_empty_or(self, default: T) -> Outcome<T> {
        match self {
            Outcome::Empty => Outcome::Data(default),
            other => other,
        }
    }
}

impl<T> From<Result<T, ApiError>> for Outcome<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Outcome::Data(data),
            Err(error) => Outcome::Error(error),
        }
    }
}

impl<T> From<ApiError> for Outcome<T> {
    fn from(error: ApiError) -> Self {
        Outcome::Error(error)
    }
}
