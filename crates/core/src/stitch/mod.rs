//! Stitch module for concatenating segments into one re-encoded file.
//!
//! This module provides the `Stitcher` trait and an FFmpeg implementation that
//! concatenates the audio stream of every input (in order) with the concat
//! filter and re-encodes the result with one fixed codec and bitrate.
//!
//! # Example
//!
//! ```ignore
//! use stitcher_core::stitch::{FfmpegStitcher, StitchConfig, StitchRequest, Stitcher};
//!
//! let stitcher = FfmpegStitcher::new(StitchConfig::default());
//! stitcher.validate().await?;
//!
//! let request = StitchRequest::new(surviving_paths, &work_dir);
//! let output = stitcher.stitch(&request, &cancel).await?;
//! let seconds = stitcher.probe_duration(&output.output_path).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::StitchConfig;
pub use error::StitchError;
pub use ffmpeg::FfmpegStitcher;
pub use traits::Stitcher;
pub use types::{
    StitchOutput, StitchRequest, OUTPUT_BITRATE_KBPS, OUTPUT_CODEC, OUTPUT_FILE_STEM, OUTPUT_TITLE,
};
