pub mod config;
pub mod download;
pub mod job;
pub mod metrics;
pub mod session;
pub mod stitch;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use download::{
    DownloadBatch, DownloadConfig, DownloadError, DownloadOrchestrator, DownloadTask, HttpFetcher,
    IntegrityError, SegmentFetcher,
};
pub use job::{JobError, JobOutcome, JobReport, JobRunner, OutputSink, StitchJob};
pub use session::{SessionConfig, SessionError, SessionMetrics, SessionState, SessionTracker};
pub use stitch::{FfmpegStitcher, StitchConfig, StitchError, StitchOutput, StitchRequest, Stitcher};
