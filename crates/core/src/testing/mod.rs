//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the fetcher and stitcher
//! traits plus an in-memory output sink, allowing full job runs without a
//! network or an ffmpeg install.
//!
//! # Example
//!
//! ```rust,ignore
//! use stitcher_core::testing::{fixtures, MockFetcher, MockResponse, MockSink, MockStitcher};
//!
//! let urls = fixtures::segment_urls(5);
//! let fetcher = MockFetcher::new();
//! fetcher.set_response(&urls[2], MockResponse::Status(404)).await;
//!
//! let stitcher = MockStitcher::new();
//! let sink = MockSink::new();
//!
//! // Run a job, then inspect sink.contents()...
//! ```

mod mock_fetcher;
mod mock_sink;
mod mock_stitcher;

pub use mock_fetcher::{MockFetcher, MockResponse};
pub use mock_sink::MockSink;
pub use mock_stitcher::MockStitcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::Config;

    /// Create `count` distinct segment URLs.
    pub fn segment_urls(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("https://cdn.example.com/segments/{}.mp3", i))
            .collect()
    }

    /// Create a config whose work directory is `work_dir`.
    pub fn config_in(work_dir: &Path) -> Config {
        let mut config = Config::default();
        config.download.work_dir = work_dir.to_path_buf();
        config
    }
}
