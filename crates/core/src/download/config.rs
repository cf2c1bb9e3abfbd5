//! Configuration for the download module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for segment downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory for per-job work directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Maximum segments downloaded at the same time (1 = sequential).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Fraction of segments that must download for the job to continue.
    /// The success rate must be strictly greater than this value.
    #[serde(default = "default_min_integrity")]
    pub min_integrity: f64,

    /// Timeout for a single segment request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent sent with segment requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("segment-stitcher")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_min_integrity() -> f64 {
    0.6
}

fn default_request_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("segment-stitcher/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            min_integrity: default_min_integrity(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl DownloadConfig {
    /// Sets the work directory.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the maximum concurrent downloads.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max;
        self
    }
}
