//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (terminal states, duration)
//! - Downloads (segments, success rate)
//! - Stitching (runs, encoding time, timeouts)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs finished, by terminal state.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stitcher_jobs_total", "Total jobs by terminal state"),
        &["state"], // "complete", "error", "timed_out", "stopped"
    )
    .unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("stitcher_job_duration_seconds", "Duration of stitch jobs")
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 180.0, 250.0, 300.0]),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// Download Metrics
// =============================================================================

/// Segments downloaded successfully.
pub static SEGMENTS_DOWNLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stitcher_segments_downloaded_total",
        "Total segments downloaded",
    )
    .unwrap()
});

/// Segments that failed to download.
pub static SEGMENTS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stitcher_segments_failed_total",
        "Total segment downloads that failed",
    )
    .unwrap()
});

/// Per-batch download success rate.
pub static DOWNLOAD_SUCCESS_RATE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "stitcher_download_success_rate",
            "Fraction of segments downloaded per batch",
        )
        .buckets(vec![0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0]),
    )
    .unwrap()
});

// =============================================================================
// Stitch Metrics
// =============================================================================

/// Stitch runs by result.
pub static STITCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stitcher_stitches_total", "Total ffmpeg stitch runs"),
        &["result"], // "success", "failed", "timeout", "cancelled"
    )
    .unwrap()
});

/// Encoding time in seconds.
pub static ENCODING_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "stitcher_encoding_duration_seconds",
            "Duration of the stitch and re-encode step",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 180.0]),
    )
    .unwrap()
});

/// Stitches killed for exceeding their timeout.
pub static STITCH_TIMEOUTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stitcher_stitch_timeouts_total",
        "Total stitches killed after timing out",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        // Downloads
        Box::new(SEGMENTS_DOWNLOADED.clone()),
        Box::new(SEGMENTS_FAILED.clone()),
        Box::new(DOWNLOAD_SUCCESS_RATE.clone()),
        // Stitching
        Box::new(STITCHES_TOTAL.clone()),
        Box::new(ENCODING_DURATION.clone()),
        Box::new(STITCH_TIMEOUTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        JOBS_TOTAL.with_label_values(&["complete"]).inc();
        SEGMENTS_DOWNLOADED.inc();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"stitcher_jobs_total".to_string()));
        assert!(names.contains(&"stitcher_segments_downloaded_total".to_string()));
    }
}
