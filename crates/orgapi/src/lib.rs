//! # orgapi
//!
//! Request-execution core of a typed client for organization-scoped REST
//! APIs (`{base}/{organization}/api/...`):
//! - A request executor with timeouts, retries with exponential backoff,
//!   status classification and optional schema validation
//! - Offset-based auto-pagination, lazy or eagerly aggregated in parallel
//!   waves
//! - A bounded-concurrency batch fetch that aggregates partial failures
//! - A declarative resource catalog dispatched through one generic call
//!
//! Every operation returns an [`Outcome`]: data, an [`ApiError`], or an
//! empty success. Nothing panics or returns a bare `Err` across the public
//! boundary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orgapi::{Client, Outcome};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")
//!         .organization("acme")
//!         .token("your-token")
//!         .build()?;
//!
//!     match client.get::<Value>("members/42", None).await {
//!         Outcome::Data(member) => println!("{member}"),
//!         Outcome::Empty => println!("no content"),
//!         Outcome::Error(error) => eprintln!("{} ({:?})", error, error.correlation_id()),
//!     }
//!
//!     let created: Outcome<Value> = client.post("members", json!({"name": "Ada"})).await;
//!     if let Some(error) = created.error() {
//!         eprintln!("create failed: {error}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// Re-export commonly used types
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, RateLimitConfig};
pub use error::{ApiError, ConfigError, ConfigResult, ErrorBody, ErrorKind};
pub use outcome::Outcome;

// Module declarations
pub mod batch;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod outcome;
pub mod pagination;
pub mod validation;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use serde_json::Value as JsonValue;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use orgapi::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ApiError, Client, ClientConfig, ErrorKind, Outcome,
        batch::{batch_fetch, batch_fetch_keyed},
        catalog::{EndpointSpec, ResourceCatalog},
        http::{HttpTransport, Method, RequestDescriptor},
        pagination::{PageFetcher, PageResponse, Paginator},
        validation::{Schema, ValidationIssue, ValidationIssues},
    };
}

/// SDK version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default first backoff delay
pub const DEFAULT_RETRY_BASE_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// Default number of concurrent fetches for pagination and batch operations
pub const DEFAULT_PARALLEL_LIMIT: usize = 5;

/// Default page size
pub const DEFAULT_PAGE_SIZE: u64 = 100;

#[cfg(test)]
mod property_tests;
