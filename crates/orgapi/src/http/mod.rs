//! HTTP layer: transport seam, request descriptors, retry policy and the
//! request executor.

pub use executor::RequestExecutor;
pub use request::{
    Method, RequestDescriptor, RequestDescriptorBuilder, RequestDescriptorBuilderError, build_url,
    query_pairs,
};
pub use retry::RetryPolicy;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

mod executor;
mod request;
mod retry;
mod transport;

/// Header carrying the per-call correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// Re-export HTTP types from the http crate for convenience
pub use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
