//! Download orchestration across all segments of a job.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::session::SessionTracker;

use super::config::DownloadConfig;
use super::error::IntegrityError;
use super::traits::SegmentFetcher;
use super::types::{DownloadBatch, DownloadTask};

/// Downloads a job's segments with bounded concurrency and gates on the
/// aggregate success rate.
pub struct DownloadOrchestrator<F: SegmentFetcher> {
    config: DownloadConfig,
    fetcher: Arc<F>,
}

impl<F: SegmentFetcher> DownloadOrchestrator<F> {
    /// Creates a new orchestrator.
    pub fn new(config: DownloadConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Downloads every URL into `dir` and returns the resolved batch.
    ///
    /// Failures are logged and do not stop other downloads. Returns only
    /// after every task has resolved.
    pub async fn download_all(&self, urls: &[String], dir: &Path) -> DownloadBatch {
        let tasks: Vec<DownloadTask> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| DownloadTask::new(index, url.clone(), dir))
            .collect();

        let concurrency = self.config.max_concurrent_downloads.max(1);
        let fetcher = self.fetcher.as_ref();

        info!(
            segments = tasks.len(),
            concurrency = concurrency,
            fetcher = fetcher.name(),
            "Downloading segments"
        );

        let resolved: Vec<DownloadTask> = stream::iter(tasks)
            .map(|mut task| async move {
                match task.fetch(fetcher).await {
                    Ok(()) => {
                        metrics::SEGMENTS_DOWNLOADED.inc();
                        debug!(
                            segment = task.sequence_index,
                            bytes = task.bytes_written,
                            elapsed_ms = task.elapsed_ms,
                            "Segment downloaded"
                        );
                    }
                    Err(e) => {
                        metrics::SEGMENTS_FAILED.inc();
                        warn!(
                            segment = task.sequence_index,
                            url = %task.source_url,
                            error = %e,
                            "Segment download failed, continuing"
                        );
                    }
                }
                task
            })
            .buffered(concurrency)
            .collect()
            .await;

        DownloadBatch::new(resolved)
    }

    /// Downloads the segments, reports the batch to the session, and returns
    /// the surviving paths in input order if the success rate passes.
    pub async fn run(
        &self,
        urls: &[String],
        dir: &Path,
        session: &SessionTracker,
    ) -> Result<Vec<PathBuf>, IntegrityError> {
        let batch = self.download_all(urls, dir).await;
        let success_rate = batch.success_rate();

        metrics::DOWNLOAD_SUCCESS_RATE.observe(success_rate);
        if let Err(e) = session.record_download_batch(&batch).await {
            debug!(error = %e, "Session rejected download batch");
        }

        match batch.check_integrity(self.config.min_integrity) {
            Ok(paths) => {
                info!(
                    success_rate = success_rate,
                    succeeded = batch.succeeded(),
                    total = batch.total(),
                    "Completed segment download"
                );
                Ok(paths)
            }
            Err(e) => {
                warn!(
                    success_rate = success_rate,
                    min_integrity = self.config.min_integrity,
                    "Download integrity check failed"
                );
                for path in batch.surviving_paths() {
                    super::types::remove_segment_file(&path).await;
                }
                Err(e)
            }
        }
    }
}
