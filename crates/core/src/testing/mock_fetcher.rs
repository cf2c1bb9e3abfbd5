//! Mock segment fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::download::{DownloadError, SegmentFetcher};

/// Scripted response for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Write these bytes.
    Body(Vec<u8>),
    /// Fail with this HTTP status.
    Status(u16),
    /// Fail with a transport error.
    TransportError(String),
    /// Wait, then write the default body.
    Delayed(Duration),
}

/// Mock implementation of the SegmentFetcher trait.
///
/// By default every URL succeeds and the segment's content is the URL
/// itself, which makes concatenation order easy to assert.
///
/// # Example
///
/// ```rust,ignore
/// use stitcher_core::testing::{MockFetcher, MockResponse};
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_response("https://cdn.example.com/1.mp3", MockResponse::Status(404)).await;
///
/// let orchestrator = DownloadOrchestrator::new(config, fetcher.clone());
/// // ...
/// assert_eq!(fetcher.request_count().await, 5);
/// ```
#[derive(Debug, Clone)]
pub struct MockFetcher {
    /// Scripted responses by URL.
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    /// Requested URLs in call order.
    requests: Arc<RwLock<Vec<String>>>,
    /// Delay applied before every response.
    delay: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the response for a URL.
    pub async fn set_response(&self, url: &str, response: MockResponse) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), response);
    }

    /// Set a delay applied before every response.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Get the URLs requested so far.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.read().await.get(url).cloned();
        let body = match response {
            None => url.as_bytes().to_vec(),
            Some(MockResponse::Body(body)) => body,
            Some(MockResponse::Status(status)) => {
                return Err(DownloadError::HttpStatus {
                    url: url.to_string(),
                    status,
                })
            }
            Some(MockResponse::TransportError(reason)) => {
                return Err(DownloadError::Transport {
                    url: url.to_string(),
                    reason,
                })
            }
            Some(MockResponse::Delayed(wait)) => {
                tokio::time::sleep(wait).await;
                url.as_bytes().to_vec()
            }
        };

        tokio::fs::write(destination, &body).await?;
        Ok(body.len() as u64)
    }
}

#[async_trait]
impl SegmentFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        self.requests.write().await.push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.respond(url, destination).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
