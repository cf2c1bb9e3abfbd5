//! Types for the download module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

use super::error::{DownloadError, IntegrityError};
use super::traits::SegmentFetcher;

/// Extension used when the URL does not carry a usable one.
const FALLBACK_EXTENSION: &str = "audio";

/// One segment download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Position of the segment in the job's input list.
    pub sequence_index: usize,
    /// Remote location of the segment.
    pub source_url: String,
    /// Local file the segment is written to.
    pub destination_path: PathBuf,
    /// Whether the full body was written.
    pub succeeded: bool,
    /// Bytes written to the destination.
    pub bytes_written: u64,
    /// Time spent downloading in milliseconds.
    pub elapsed_ms: u64,
    /// Failure reason, if the download failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadTask {
    /// Creates a task writing into `dir` under a freshly generated file name.
    pub fn new(sequence_index: usize, source_url: impl Into<String>, dir: &Path) -> Self {
        let source_url = source_url.into();
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            file_extension(&source_url)
        );

        Self {
            sequence_index,
            destination_path: dir.join(file_name),
            source_url,
            succeeded: false,
            bytes_written: 0,
            elapsed_ms: 0,
            error: None,
        }
    }

    /// Identifier used when recording failures.
    pub fn segment_id(&self) -> String {
        format!("segment-{:03}", self.sequence_index)
    }

    /// Downloads the segment with the given fetcher.
    ///
    /// Creates the destination directory if needed. On failure the partial
    /// file is removed and the error is returned; the task is marked failed.
    pub async fn fetch<F>(&mut self, fetcher: &F) -> Result<(), DownloadError>
    where
        F: SegmentFetcher + ?Sized,
    {
        let start = Instant::now();
        let result = self.fetch_inner(fetcher).await;
        self.elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(bytes) => {
                self.bytes_written = bytes;
                self.succeeded = true;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.succeeded = false;
                self.error = Some(e.to_string());
                self.discard().await;
                Err(e)
            }
        }
    }

    async fn fetch_inner<F>(&self, fetcher: &F) -> Result<u64, DownloadError>
    where
        F: SegmentFetcher + ?Sized,
    {
        if let Some(parent) = self.destination_path.parent() {
            // create_dir_all succeeds if another task created it concurrently
            tokio::fs::create_dir_all(parent).await?;
        }
        fetcher.fetch(&self.source_url, &self.destination_path).await
    }

    /// Removes the local file, if any.
    pub async fn discard(&self) {
        remove_segment_file(&self.destination_path).await;
    }
}

/// Removes a downloaded segment file, ignoring files that are already gone.
pub(crate) async fn remove_segment_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove segment file");
        }
    }
}

/// Derives a short file extension from the URL path.
fn file_extension(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return FALLBACK_EXTENSION.to_string();
    };

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Outcome of downloading every segment of a job.
///
/// Assembled once after all tasks resolved; tasks are kept in input order.
#[derive(Debug, Clone)]
pub struct DownloadBatch {
    tasks: Vec<DownloadTask>,
}

impl DownloadBatch {
    /// Creates a batch from resolved tasks.
    pub fn new(mut tasks: Vec<DownloadTask>) -> Self {
        tasks.sort_by_key(|t| t.sequence_index);
        Self { tasks }
    }

    /// All tasks in input order.
    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    /// Number of segments in the batch.
    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    /// Number of segments that downloaded.
    pub fn succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.succeeded).count()
    }

    /// `succeeded / total`; an empty batch has a rate of 0.
    pub fn success_rate(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.total() as f64
    }

    /// Tasks that failed, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &DownloadTask> {
        self.tasks.iter().filter(|t| !t.succeeded)
    }

    /// Local paths of the segments that downloaded, in input order.
    pub fn surviving_paths(&self) -> Vec<PathBuf> {
        self.tasks
            .iter()
            .filter(|t| t.succeeded)
            .map(|t| t.destination_path.clone())
            .collect()
    }

    /// Returns the surviving paths if the success rate is strictly above
    /// `min_integrity`.
    pub fn check_integrity(&self, min_integrity: f64) -> Result<Vec<PathBuf>, IntegrityError> {
        let success_rate = self.success_rate();
        if success_rate > min_integrity {
            Ok(self.surviving_paths())
        } else {
            Err(IntegrityError {
                success_rate,
                succeeded: self.succeeded(),
                total: self.total(),
                min_integrity,
            })
        }
    }
}
