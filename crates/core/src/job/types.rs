//! Types for the job module.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::AsyncWrite;

use crate::session::SessionMetrics;

/// Outcome message when the stitched file was not forwarded.
pub const STITCHED_ONLY_MESSAGE: &str = "Successfully downloaded and stitched, but not uploaded";

/// Outcome message when the stitched file was written to the sink.
pub const FORWARDED_MESSAGE: &str = "Successfully transcoded and stitched audio";

/// Destination the stitched file is streamed to.
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

/// One unit of work: a list of segment URLs to stitch.
pub struct StitchJob {
    /// Job identifier, used for logs, metrics and the work directory name.
    pub job_id: String,
    /// Segment URLs in playback order.
    pub urls: Vec<String>,
    /// Optional sink for the stitched output.
    pub sink: Option<OutputSink>,
}

impl StitchJob {
    /// Creates a job without an output sink.
    pub fn new(job_id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            urls,
            sink: None,
        }
    }

    /// Creates a job with a generated identifier.
    pub fn with_generated_id(urls: Vec<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string(), urls)
    }

    /// Streams the stitched output to `sink` once the job succeeds.
    pub fn with_sink(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Directory name for one run of this job: `job-<id>-<uuid>`.
    /// Characters outside `[A-Za-z0-9_-]` are replaced so the id cannot
    /// escape the work root. The suffix is fresh on every call, so ids that
    /// sanitize to the same name never share a directory.
    pub fn work_dir_name(&self) -> String {
        let name: String = self
            .job_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let run = uuid::Uuid::new_v4().simple();
        if name.is_empty() {
            format!("job-{}", run)
        } else {
            format!("job-{}-{}", name, run)
        }
    }
}

impl fmt::Debug for StitchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StitchJob")
            .field("job_id", &self.job_id)
            .field("urls", &self.urls)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Stitched locally, no sink was supplied.
    StitchedOnly,
    /// Stitched and written to the sink.
    Forwarded,
    /// Failed with the given error text.
    Failed(String),
}

impl JobOutcome {
    /// Human-readable outcome message.
    pub fn message(&self) -> &str {
        match self {
            Self::StitchedOnly => STITCHED_ONLY_MESSAGE,
            Self::Forwarded => FORWARDED_MESSAGE,
            Self::Failed(error) => error,
        }
    }

    /// Whether the job produced a stitched file.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Result of one job, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub outcome: JobOutcome,
    pub message: String,
    pub metrics: SessionMetrics,
}

impl JobReport {
    /// Builds the report from the outcome and the final session snapshot.
    pub fn new(outcome: JobOutcome, metrics: SessionMetrics) -> Self {
        Self {
            job_id: metrics.job_id.clone(),
            message: outcome.message().to_string(),
            outcome,
            metrics,
        }
    }

    /// Whether the job outcome is a success.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
