//! Common test utilities and helpers

use async_trait::async_trait;
use orgapi::http::{HeaderMap, HttpRequest, HttpResponse, HttpTransport, TransportError};
use orgapi::{Client, ClientBuilder};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Load a response fixture
#[allow(dead_code)]
pub fn load_response_fixture(name: &str) -> Value {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("fixtures")
        .join("responses")
        .join(format!("{}.json", name));

    let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to load response fixture '{}' from {:?}: {}",
            name, path, e
        )
    });
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("Fixture '{}' is not JSON: {}", name, e))
}

/// Create a test bearer token
#[allow(dead_code)]
pub fn test_token() -> String {
    "org-test-token-0123456789".to_string()
}

/// Organization segment used by every test client
#[allow(dead_code)]
pub const TEST_ORG: &str = "acme";

/// Builder pointed at `base_url` with fast retries
#[allow(dead_code)]
pub fn client_builder(base_url: impl Into<String>) -> ClientBuilder {
    Client::builder()
        .base_url(base_url)
        .organization(TEST_ORG)
        .token(test_token())
        .retry_base_delay(Duration::from_millis(10))
}

/// One scripted reaction of [`ScriptedTransport`]
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with this response
    Respond(HttpResponse),
    /// Fail at the transport level
    Fail(TransportError),
    /// Never answer
    Hang,
}

#[allow(dead_code)]
impl Step {
    /// Response with an empty body
    pub fn status(status: u16) -> Self {
        Step::Respond(HttpResponse::new(status, HeaderMap::new(), ""))
    }

    /// JSON response
    pub fn json(status: u16, body: Value) -> Self {
        Step::Respond(HttpResponse::json_body(status, &body))
    }

    /// Response carrying one header
    pub fn with_header(status: u16, name: &'static str, value: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        Step::Respond(HttpResponse::new(status, headers, ""))
    }
}

/// In-memory transport replaying a script and recording every attempt.
///
/// Timestamps come from `tokio::time`, so they are exact under
/// `#[tokio::test(start_paused = true)]`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Option<Step>>,
    log: Mutex<Vec<(Instant, HttpRequest)>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    in_flight_samples: Mutex<Vec<usize>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Replay `steps` in order
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Answer every request with `step` once the script is exhausted
    pub fn repeating(step: Step) -> Self {
        Self {
            fallback: Mutex::new(Some(step)),
            ..Self::default()
        }
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Wrap in an `Arc` ready for [`Client::with_transport`]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of attempts received so far
    pub fn attempts(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    /// Gaps between consecutive attempts
    pub fn gaps(&self) -> Vec<Duration> {
        let log = self.log.lock().unwrap();
        log.windows(2).map(|pair| pair[1].0 - pair[0].0).collect()
    }

    /// In-flight count observed as each request arrived
    pub fn in_flight_samples(&self) -> Vec<usize> {
        self.in_flight_samples.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            return step;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Step::Fail(TransportError::Connection("script exhausted".into())))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().unwrap().push((Instant::now(), request));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight_samples.lock().unwrap().push(now);

        let step = self.next_step();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Step::Respond(response) => Ok(response),
            Step::Fail(error) => Err(error),
            Step::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Client over a scripted transport
#[allow(dead_code)]
pub fn scripted_client(transport: Arc<ScriptedTransport>, configure: impl FnOnce(ClientBuilder) -> ClientBuilder) -> Client {
    configure(client_builder("https://api.test"))
        .transport(transport)
        .build()
        .expect("Failed to build client")
}
