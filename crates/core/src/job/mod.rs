//! Job module: one stitch job from segment URLs to a forwarded file.
//!
//! # Example
//!
//! ```ignore
//! use stitcher_core::job::{JobRunner, StitchJob};
//!
//! let runner = JobRunner::new(config, HttpFetcher::new(&config.download)?, FfmpegStitcher::new(config.stitch.clone()));
//! let job = StitchJob::new("episode-42", urls).with_sink(tokio::fs::File::create("out.mp3").await?);
//!
//! let report = runner.run(job).await;
//! println!("{}", report.message);
//! ```

mod error;
mod runner;
mod types;

pub use error::JobError;
pub use runner::JobRunner;
pub use types::{
    JobOutcome, JobReport, OutputSink, StitchJob, FORWARDED_MESSAGE, STITCHED_ONLY_MESSAGE,
};
