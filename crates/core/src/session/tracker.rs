//! Session tracker implementation.

use chrono::Utc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::download::DownloadBatch;
use crate::metrics::{ENCODING_DURATION, JOBS_TOTAL, JOB_DURATION};

use super::config::SessionConfig;
use super::types::{SessionError, SessionMetrics, SessionState};

/// Tracks state and metrics of one job.
///
/// Created per job inside a tokio runtime; creation arms the deadline
/// watchdog. When the deadline passes before a terminal transition, the
/// session becomes `TimedOut` and the job cancellation token is cancelled.
pub struct SessionTracker {
    started_at: Instant,
    deadline: Duration,
    metrics: RwLock<SessionMetrics>,
    state_tx: watch::Sender<SessionState>,
    job_token: CancellationToken,
    watchdog_token: CancellationToken,
}

impl SessionTracker {
    /// Creates a queued session and arms its watchdog.
    pub fn new(job_id: impl Into<String>, config: &SessionConfig) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SessionState::Queued);
        let tracker = Arc::new(Self {
            started_at: Instant::now(),
            deadline: Duration::from_millis(config.deadline_ms),
            metrics: RwLock::new(SessionMetrics::new(job_id.into(), Utc::now())),
            state_tx,
            job_token: CancellationToken::new(),
            watchdog_token: CancellationToken::new(),
        });

        Self::spawn_watchdog(
            Arc::downgrade(&tracker),
            tracker.deadline,
            tracker.watchdog_token.clone(),
        );
        tracker
    }

    fn spawn_watchdog(tracker: Weak<Self>, deadline: Duration, stop: CancellationToken) {
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    if let Some(tracker) = tracker.upgrade() {
                        tracker.time_out().await;
                    }
                }
            }
        });
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Token cancelled when the job deadline passes or the session is stopped.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.job_token.child_token()
    }

    /// Configured job deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Returns a copy of the current metrics.
    pub async fn snapshot(&self) -> SessionMetrics {
        self.metrics.read().await.clone()
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Queued -> Running.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        if metrics.state != SessionState::Queued {
            warn!(job_id = %metrics.job_id, state = %metrics.state, "Cannot start session");
            return Err(SessionError::InvalidTransition {
                from: metrics.state,
                to: SessionState::Running,
            });
        }
        metrics.state = SessionState::Running;
        self.state_tx.send_replace(SessionState::Running);
        Ok(())
    }

    /// Stops the session without completing it and cancels in-flight work.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.finalize(SessionState::Stopped, None).await?;
        self.job_token.cancel();
        Ok(())
    }

    /// Marks the job complete.
    pub async fn complete(&self) -> Result<(), SessionError> {
        self.finalize(SessionState::Complete, None).await
    }

    /// Marks the job failed with the given error.
    pub async fn fail(&self, error: impl Into<String>) -> Result<(), SessionError> {
        self.finalize(SessionState::Error, Some(error.into())).await
    }

    async fn time_out(&self) {
        let reason = format!("job exceeded deadline of {} ms", self.deadline.as_millis());
        if self.finalize(SessionState::TimedOut, Some(reason)).await.is_ok() {
            warn!(
                deadline_ms = self.deadline.as_millis() as u64,
                "Session timed out, cancelling in-flight work"
            );
            self.job_token.cancel();
        }
    }

    /// Applies a terminal transition exactly once.
    async fn finalize(
        &self,
        state: SessionState,
        error: Option<String>,
    ) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        if metrics.state.is_terminal() {
            warn!(
                job_id = %metrics.job_id,
                state = %metrics.state,
                requested = %state,
                "Session already finalized"
            );
            return Err(SessionError::AlreadyFinalized {
                state: metrics.state,
            });
        }

        self.watchdog_token.cancel();

        let duration_millis = self.started_at.elapsed().as_millis() as u64;
        metrics.state = state;
        metrics.end_time = Some(Utc::now());
        metrics.duration_millis = duration_millis;
        metrics.duration_mins = (duration_millis as f64 / 60_000.0 * 100.0).round() / 100.0;
        metrics.terminal_error = error;
        self.state_tx.send_replace(state);

        JOBS_TOTAL.with_label_values(&[state.as_str()]).inc();
        JOB_DURATION
            .with_label_values(&[state.as_str()])
            .observe(duration_millis as f64 / 1000.0);

        info!(
            job_id = %metrics.job_id,
            state = %metrics.state,
            duration_ms = metrics.duration_millis,
            success_rate = ?metrics.download_success_rate,
            encoding_ms = ?metrics.encoding_duration_millis,
            failures = metrics.download_failures.len(),
            error = ?metrics.terminal_error,
            "Session finalized"
        );
        Ok(())
    }

    // =========================================================================
    // Metric updates
    // =========================================================================

    fn ensure_open(metrics: &SessionMetrics, field: &'static str) -> Result<(), SessionError> {
        if metrics.state.is_terminal() {
            warn!(
                job_id = %metrics.job_id,
                state = %metrics.state,
                field = field,
                "Ignoring metric update on finalized session"
            );
            return Err(SessionError::AlreadyFinalized {
                state: metrics.state,
            });
        }
        Ok(())
    }

    /// Records the download success rate (fraction in `[0, 1]`). Once only.
    pub async fn set_download_success_rate(&self, rate: f64) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        Self::ensure_open(&metrics, "download_success_rate")?;
        if metrics.download_success_rate.is_some() {
            warn!(job_id = %metrics.job_id, "Download success rate already recorded");
            return Err(SessionError::AlreadyRecorded {
                field: "download_success_rate",
            });
        }
        metrics.download_success_rate = Some(rate.clamp(0.0, 1.0));
        Ok(())
    }

    /// Records a failed segment.
    pub async fn add_download_failure(
        &self,
        segment_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        Self::ensure_open(&metrics, "download_failures")?;
        metrics
            .download_failures
            .insert(segment_id.into(), source.into());
        Ok(())
    }

    /// Records the success rate and every failure of a batch at once.
    pub async fn record_download_batch(&self, batch: &DownloadBatch) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        Self::ensure_open(&metrics, "download_success_rate")?;
        if metrics.download_success_rate.is_some() {
            return Err(SessionError::AlreadyRecorded {
                field: "download_success_rate",
            });
        }
        metrics.download_success_rate = Some(batch.success_rate());
        for task in batch.failures() {
            metrics
                .download_failures
                .insert(task.segment_id(), task.source_url.clone());
        }
        Ok(())
    }

    /// Records the encoding time. Requires the success rate to be recorded
    /// first. Once only.
    pub async fn set_encoding_time(&self, elapsed: Duration) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        Self::ensure_open(&metrics, "encoding_duration_millis")?;
        if metrics.download_success_rate.is_none() {
            return Err(SessionError::OutOfOrder {
                field: "encoding_duration_millis",
                requires: "download_success_rate",
            });
        }
        if metrics.encoding_duration_millis.is_some() {
            warn!(job_id = %metrics.job_id, "Encoding time already recorded");
            return Err(SessionError::AlreadyRecorded {
                field: "encoding_duration_millis",
            });
        }
        let millis = elapsed.as_millis() as u64;
        metrics.encoding_duration_millis = Some(millis);
        ENCODING_DURATION.observe(millis as f64 / 1000.0);
        Ok(())
    }

    /// Records the stitched output's size and probed duration.
    pub async fn set_output_details(
        &self,
        size_bytes: u64,
        duration_secs: Option<f64>,
    ) -> Result<(), SessionError> {
        let mut metrics = self.metrics.write().await;
        Self::ensure_open(&metrics, "output_size_bytes")?;
        metrics.output_size_bytes = Some(size_bytes);
        metrics.output_duration_secs = duration_secs;
        Ok(())
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.watchdog_token.cancel();
    }
}
