//! Runs one stitch job end to end.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::download::{DownloadOrchestrator, SegmentFetcher};
use crate::session::{SessionError, SessionState, SessionTracker};
use crate::stitch::{StitchRequest, Stitcher};

use super::error::JobError;
use super::types::{JobOutcome, JobReport, OutputSink, StitchJob};

/// Drives a job through download, integrity check, stitch and forward.
///
/// Each job gets its own [`SessionTracker`] and work directory under
/// `download.work_dir`. The directory is removed when the job ends, whatever
/// the outcome.
pub struct JobRunner<F: SegmentFetcher, S: Stitcher> {
    config: Config,
    orchestrator: DownloadOrchestrator<F>,
    stitcher: Arc<S>,
}

impl<F: SegmentFetcher, S: Stitcher> JobRunner<F, S> {
    /// Creates a runner from a validated config and its collaborators.
    pub fn new(config: Config, fetcher: F, stitcher: S) -> Self {
        Self {
            orchestrator: DownloadOrchestrator::new(config.download.clone(), fetcher),
            stitcher: Arc::new(stitcher),
            config,
        }
    }

    /// The configuration jobs run with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the session for a job. Use with [`Self::run_with_session`] to
    /// observe or stop the job while it runs.
    pub fn create_session(&self, job_id: &str) -> Arc<SessionTracker> {
        SessionTracker::new(job_id, &self.config.session)
    }

    /// Runs a job with a fresh session.
    pub async fn run(&self, job: StitchJob) -> JobReport {
        let session = self.create_session(&job.job_id);
        self.run_with_session(job, session).await
    }

    /// Runs a job against an existing queued session.
    pub async fn run_with_session(&self, job: StitchJob, session: Arc<SessionTracker>) -> JobReport {
        let work_dir = self.config.download.work_dir.join(job.work_dir_name());
        let StitchJob { job_id, urls, sink } = job;
        let cancel = session.cancellation_token();

        let result = match session.start().await {
            Ok(()) => {
                info!(
                    job_id = %job_id,
                    segments = urls.len(),
                    work_dir = %work_dir.display(),
                    "Starting stitch job"
                );
                tokio::select! {
                    result = self.execute(&urls, &work_dir, sink, &session, &cancel) => result,
                    // Resolved from the session state below
                    _ = cancel.cancelled() => Err(JobError::Stopped),
                }
            }
            Err(e) => Err(e.into()),
        };

        let outcome = self.finish(&session, result).await;
        remove_work_dir(&work_dir).await;

        JobReport::new(outcome, session.snapshot().await)
    }

    async fn execute(
        &self,
        urls: &[String],
        work_dir: &Path,
        sink: Option<OutputSink>,
        session: &SessionTracker,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, JobError> {
        tokio::fs::create_dir_all(&self.config.download.work_dir).await?;
        // Fails on AlreadyExists rather than sharing another run's files
        tokio::fs::create_dir(work_dir).await?;

        let paths = self.orchestrator.run(urls, work_dir, session).await?;

        let request = StitchRequest::new(paths, work_dir);
        let stitched = self.stitcher.stitch(&request, cancel).await;

        // Segments are consumed either way
        for input in &request.input_paths {
            if let Err(e) = tokio::fs::remove_file(input).await {
                debug!(path = %input.display(), error = %e, "Failed to remove segment");
            }
        }
        let output = stitched?;

        session
            .set_encoding_time(Duration::from_millis(output.elapsed_ms))
            .await?;

        let duration_secs = if self.config.stitch.probe_output {
            match self.stitcher.probe_duration(&output.output_path).await {
                Ok(seconds) => Some(seconds),
                Err(e) => {
                    warn!(error = %e, "Could not probe stitched duration");
                    None
                }
            }
        } else {
            None
        };
        session
            .set_output_details(output.output_size_bytes, duration_secs)
            .await?;

        match sink {
            None => {
                info!(
                    size_bytes = output.output_size_bytes,
                    "No sink supplied, stitched output not forwarded"
                );
                Ok(JobOutcome::StitchedOnly)
            }
            Some(mut sink) => {
                let written = forward(&output.output_path, &mut sink)
                    .await
                    .map_err(JobError::Sink)?;
                info!(bytes = written, "Forwarded stitched output");
                Ok(JobOutcome::Forwarded)
            }
        }
    }

    /// Applies the terminal transition and resolves the job outcome.
    async fn finish(
        &self,
        session: &SessionTracker,
        result: Result<JobOutcome, JobError>,
    ) -> JobOutcome {
        let deadline_ms = session.deadline().as_millis() as u64;

        // A timeout or stop wins over whatever the pipeline returned
        let result = match interruption(session.state(), deadline_ms) {
            Some(err) => Err(err),
            None => result,
        };

        match result {
            Ok(outcome) => match session.complete().await {
                Ok(()) => {
                    info!(outcome = outcome.message(), "Stitch job complete");
                    outcome
                }
                Err(e) => JobOutcome::Failed(rejected(e, deadline_ms).to_string()),
            },
            Err(err) => {
                let message = err.to_string();
                match session.fail(message.clone()).await {
                    Ok(()) => {
                        error!(error = %message, "Stitch job failed");
                        JobOutcome::Failed(message)
                    }
                    Err(e) => JobOutcome::Failed(rejected(e, deadline_ms).to_string()),
                }
            }
        }
    }
}

/// The error for a session that was finalized outside the pipeline.
fn interruption(state: SessionState, deadline_ms: u64) -> Option<JobError> {
    match state {
        SessionState::TimedOut => Some(JobError::TimedOut { deadline_ms }),
        SessionState::Stopped => Some(JobError::Stopped),
        _ => None,
    }
}

fn rejected(err: SessionError, deadline_ms: u64) -> JobError {
    if let SessionError::AlreadyFinalized { state } = &err {
        if let Some(interrupted) = interruption(*state, deadline_ms) {
            return interrupted;
        }
    }
    JobError::Session(err)
}

/// Streams a file into the sink and shuts the sink down.
async fn forward(path: &Path, sink: &mut OutputSink) -> std::io::Result<u64> {
    let mut file = tokio::fs::File::open(path).await?;
    let written = tokio::io::copy(&mut file, sink).await?;
    sink.shutdown().await?;
    Ok(written)
}

async fn remove_work_dir(work_dir: &Path) {
    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => debug!(path = %work_dir.display(), "Removed work directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %work_dir.display(), error = %e, "Failed to remove work directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitch::StitchError;
    use crate::testing::{fixtures, MockFetcher, MockSink, MockStitcher};
    use tempfile::TempDir;

    fn is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }

    fn runner(dir: &Path) -> (JobRunner<MockFetcher, MockStitcher>, MockFetcher, MockStitcher) {
        let fetcher = MockFetcher::new();
        let stitcher = MockStitcher::new();
        let runner = JobRunner::new(
            fixtures::config_in(dir),
            fetcher.clone(),
            stitcher.clone(),
        );
        (runner, fetcher, stitcher)
    }

    #[tokio::test]
    async fn test_stitched_only_without_sink() {
        let dir = TempDir::new().unwrap();
        let (runner, _, stitcher) = runner(dir.path());
        let job = StitchJob::new("no-sink", fixtures::segment_urls(3));

        let report = runner.run(job).await;

        assert_eq!(report.outcome, JobOutcome::StitchedOnly);
        assert_eq!(
            report.message,
            "Successfully downloaded and stitched, but not uploaded"
        );
        assert_eq!(report.metrics.state, SessionState::Complete);
        assert_eq!(report.metrics.output_duration_secs, Some(30.0));
        assert_eq!(stitcher.recorded_requests().await.len(), 1);
        assert!(is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_forwarded_to_sink() {
        let dir = TempDir::new().unwrap();
        let (runner, _, _) = runner(dir.path());
        let urls = fixtures::segment_urls(2);
        let sink = MockSink::new();
        let job = StitchJob::new("sink", urls.clone()).with_sink(sink.clone());

        let report = runner.run(job).await;

        assert_eq!(report.outcome, JobOutcome::Forwarded);
        assert_eq!(sink.contents(), format!("{}{}", urls[0], urls[1]).into_bytes());
        assert!(sink.was_shut_down());
        assert_eq!(
            report.metrics.output_size_bytes,
            Some((urls[0].len() + urls[1].len()) as u64)
        );
    }

    #[tokio::test]
    async fn test_stitch_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        let (runner, _, stitcher) = runner(dir.path());
        stitcher
            .set_next_error(StitchError::conversion_failed("exit code 1", None))
            .await;

        let report = runner
            .run(StitchJob::new("bad-encode", fixtures::segment_urls(2)))
            .await;

        assert_eq!(
            report.outcome,
            JobOutcome::Failed("Stitch failed: exit code 1".to_string())
        );
        assert_eq!(report.metrics.state, SessionState::Error);
        assert_eq!(
            report.metrics.terminal_error.as_deref(),
            Some("Stitch failed: exit code 1")
        );
        assert_eq!(report.metrics.encoding_duration_millis, None);
        assert!(is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_sink_failure_fails_job() {
        let dir = TempDir::new().unwrap();
        let (runner, _, _) = runner(dir.path());
        let job = StitchJob::new("broken-sink", fixtures::segment_urls(2))
            .with_sink(MockSink::failing());

        let report = runner.run(job).await;

        assert!(!report.is_success());
        assert!(report.message.starts_with("Failed to write stitched audio to sink"));
        assert_eq!(report.metrics.state, SessionState::Error);
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let (runner, _, stitcher) = runner(dir.path());
        stitcher.set_probe_seconds(None).await;

        let report = runner
            .run(StitchJob::new("no-probe", fixtures::segment_urls(2)))
            .await;

        assert_eq!(report.outcome, JobOutcome::StitchedOnly);
        assert_eq!(report.metrics.output_duration_secs, None);
        assert!(report.metrics.output_size_bytes.is_some());
    }

    #[tokio::test]
    async fn test_stop_cancels_running_job() {
        let dir = TempDir::new().unwrap();
        let (runner, fetcher, _) = runner(dir.path());
        fetcher.set_delay(Duration::from_secs(30)).await;
        let urls = fixtures::segment_urls(2);

        let session = runner.create_session("stopped");
        let stopper = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.stop().await.unwrap();
        });

        let report = runner
            .run_with_session(StitchJob::new("stopped", urls), session)
            .await;

        assert_eq!(report.outcome, JobOutcome::Failed("Job stopped".to_string()));
        assert_eq!(report.metrics.state, SessionState::Stopped);
        assert!(is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_config_is_exposed() {
        let dir = TempDir::new().unwrap();
        let (runner, _, _) = runner(dir.path());
        assert_eq!(runner.config().download.work_dir, dir.path());
    }
}
