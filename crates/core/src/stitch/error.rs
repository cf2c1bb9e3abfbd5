//! Error types for the stitch module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while stitching or probing.
#[derive(Debug, Error)]
pub enum StitchError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Nothing to stitch.
    #[error("No input files to stitch")]
    NoInputs,

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// FFmpeg exited unsuccessfully or reported errors.
    #[error("Stitch failed: {reason}")]
    ConversionFailed {
        reason: String,
        output: Option<String>,
    },

    /// FFmpeg did not finish in time and was killed.
    #[error("Stitch timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The job was cancelled while ffmpeg was running.
    #[error("Stitch cancelled")]
    Cancelled,

    /// FFprobe failed.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// FFprobe output was not a duration.
    #[error("Failed to parse probe output: {reason}")]
    ParseError { reason: String },

    /// I/O error while running the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StitchError {
    /// Creates a stitch failure carrying the captured process output.
    pub fn conversion_failed(reason: impl Into<String>, output: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            output,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }
}
