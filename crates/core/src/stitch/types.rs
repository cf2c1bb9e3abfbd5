//! Types for the stitch module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output audio codec.
pub const OUTPUT_CODEC: &str = "mp3";

/// Output audio bitrate in kbps.
pub const OUTPUT_BITRATE_KBPS: u32 = 128;

/// Title written into the output's metadata.
pub const OUTPUT_TITLE: &str = "Stitched Audio";

/// File name of the stitched output, without extension.
pub const OUTPUT_FILE_STEM: &str = "stitched_audio";

/// A request to concatenate files into one re-encoded output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchRequest {
    /// Inputs in concatenation order.
    pub input_paths: Vec<PathBuf>,
    /// Output file.
    pub output_path: PathBuf,
    /// FFmpeg audio codec.
    pub codec: String,
    /// Audio bitrate in kbps.
    pub bitrate_kbps: u32,
    /// Metadata written to the output, after stripping input metadata.
    pub metadata: BTreeMap<String, String>,
}

impl StitchRequest {
    /// Creates a request with the fixed codec, bitrate and title, writing to
    /// `stitched_audio.<codec>` inside `output_dir`.
    pub fn new(input_paths: Vec<PathBuf>, output_dir: &Path) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), OUTPUT_TITLE.to_string());

        Self {
            input_paths,
            output_path: output_dir.join(format!("{}.{}", OUTPUT_FILE_STEM, OUTPUT_CODEC)),
            codec: OUTPUT_CODEC.to_string(),
            bitrate_kbps: OUTPUT_BITRATE_KBPS,
            metadata,
        }
    }

    /// Builds the concat filter graph, e.g. `[0:0][1:0]concat=n=2:v=0:a=1[output]`.
    pub fn filter_graph(&self) -> String {
        let mut graph: String = (0..self.input_paths.len())
            .map(|k| format!("[{}:0]", k))
            .collect();
        graph.push_str(&format!(
            "concat=n={}:v=0:a=1[output]",
            self.input_paths.len()
        ));
        graph
    }
}

/// Result of a successful stitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchOutput {
    /// Path to the stitched file.
    pub output_path: PathBuf,
    /// Size of the stitched file.
    pub output_size_bytes: u64,
    /// Wall time spent encoding in milliseconds.
    pub elapsed_ms: u64,
}
