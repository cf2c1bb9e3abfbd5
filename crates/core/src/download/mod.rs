//! Segment download module.
//!
//! Downloads every segment of a job into the job's work directory, tolerating
//! individual failures, and decides whether enough segments survived to stitch.
//!
//! # Example
//!
//! ```ignore
//! use stitcher_core::download::{DownloadConfig, DownloadOrchestrator, HttpFetcher};
//!
//! let config = DownloadConfig::default();
//! let fetcher = HttpFetcher::new(&config)?;
//! let orchestrator = DownloadOrchestrator::new(config, fetcher);
//!
//! // Reports the success rate to the session and gates on `min_integrity`
//! let paths = orchestrator.run(&urls, &work_dir, &session).await?;
//! ```

mod config;
mod error;
mod http;
mod orchestrator;
mod traits;
mod types;

pub use config::DownloadConfig;
pub use error::{DownloadError, IntegrityError};
pub use http::HttpFetcher;
pub use orchestrator::DownloadOrchestrator;
pub use traits::SegmentFetcher;
pub use types::{DownloadBatch, DownloadTask};
