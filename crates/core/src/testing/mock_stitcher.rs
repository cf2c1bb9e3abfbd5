//! Mock stitcher for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::stitch::{StitchError, StitchOutput, StitchRequest, Stitcher};

/// Mock implementation of the Stitcher trait.
///
/// The stitched output is the byte concatenation of the inputs, in request
/// order. Provides controllable behavior for testing:
/// - Track stitch requests for assertions
/// - Simulate failures and slow encodes
/// - Control probe results
#[derive(Debug, Clone)]
pub struct MockStitcher {
    /// Recorded requests.
    requests: Arc<RwLock<Vec<StitchRequest>>>,
    /// If set, the next stitch will fail with this error.
    next_error: Arc<RwLock<Option<StitchError>>>,
    /// Simulated encoding time. Honors cancellation.
    delay: Arc<RwLock<Duration>>,
    /// Duration reported by probe_duration; `None` makes probing fail.
    probe_seconds: Arc<RwLock<Option<f64>>>,
}

impl Default for MockStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStitcher {
    /// Create a new mock stitcher.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            probe_seconds: Arc::new(RwLock::new(Some(30.0))),
        }
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<StitchRequest> {
        self.requests.read().await.clone()
    }

    /// Make the next stitch fail.
    pub async fn set_next_error(&self, error: StitchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated encoding time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Set the probed duration, or `None` to make probing fail.
    pub async fn set_probe_seconds(&self, seconds: Option<f64>) {
        *self.probe_seconds.write().await = seconds;
    }
}

#[async_trait]
impl Stitcher for MockStitcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stitch(
        &self,
        request: &StitchRequest,
        cancel: &CancellationToken,
    ) -> Result<StitchOutput, StitchError> {
        let start = Instant::now();
        self.requests.write().await.push(request.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if request.input_paths.is_empty() {
            return Err(StitchError::NoInputs);
        }

        let delay = *self.delay.read().await;
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(StitchError::Cancelled),
        }

        let mut stitched = Vec::new();
        for input in &request.input_paths {
            stitched.extend(tokio::fs::read(input).await?);
        }
        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output_path, &stitched).await?;

        Ok(StitchOutput {
            output_path: request.output_path.clone(),
            output_size_bytes: stitched.len() as u64,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, StitchError> {
        match *self.probe_seconds.read().await {
            Some(seconds) => Ok(seconds),
            None => Err(StitchError::probe_failed(format!(
                "mock probe failure for {}",
                path.display()
            ))),
        }
    }

    async fn validate(&self) -> Result<(), StitchError> {
        Ok(())
    }
}
