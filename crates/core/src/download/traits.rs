//! Trait definitions for the download module.

use async_trait::async_trait;
use std::path::Path;

use super::error::DownloadError;

/// Fetches one remote segment into a local file.
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Streams the resource at `url` into `destination`.
    ///
    /// Returns the number of bytes written. Only returns `Ok` once the whole
    /// body has been written and flushed. The destination's parent directory
    /// already exists when this is called.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;
}
