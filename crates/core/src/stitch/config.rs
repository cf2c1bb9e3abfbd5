//! Configuration for the stitch module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based stitcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for the ffmpeg process in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// FFmpeg log level. Anything ffmpeg prints on stderr at this level
    /// fails the stitch.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Whether to probe the stitched file's duration.
    #[serde(default = "default_probe_output")]
    pub probe_output: bool,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    180_000 // 3 minutes
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_probe_output() -> bool {
    true
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_ms: default_timeout(),
            ffmpeg_log_level: default_log_level(),
            probe_output: default_probe_output(),
        }
    }
}

impl StitchConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
