//! Job lifecycle integration tests.
//!
//! These tests run whole jobs through the runner with a mock fetcher and
//! stitcher:
//! - Partial download failure still producing a forwarded file
//! - Integrity gate failures
//! - Stitch failures and timeouts
//! - Job deadline and work directory cleanup
//! - Concurrent jobs whose ids map to the same directory name
//! - Deadline kill of a real ffmpeg child process (unix)

use std::time::Duration;

use tempfile::TempDir;

use stitcher_core::{
    stitch::StitchError,
    testing::{fixtures, MockFetcher, MockResponse, MockSink, MockStitcher},
    Config, JobOutcome, JobRunner, SessionState, StitchJob,
};

/// Test helper wiring a runner to mocks in a temp work directory.
struct TestHarness {
    runner: JobRunner<MockFetcher, MockStitcher>,
    fetcher: MockFetcher,
    stitcher: MockStitcher,
    work_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let work_dir = TempDir::new().expect("Failed to create work dir");
        let mut config = fixtures::config_in(work_dir.path());
        customize(&mut config);

        let fetcher = MockFetcher::new();
        let stitcher = MockStitcher::new();
        let runner = JobRunner::new(config, fetcher.clone(), stitcher.clone());

        Self {
            runner,
            fetcher,
            stitcher,
            work_dir,
        }
    }

    /// Whether anything is left in the work root.
    fn work_root_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_dir.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn test_partial_failure_round_trip_to_file() {
    let harness = TestHarness::new();
    let urls = fixtures::segment_urls(5);
    harness
        .fetcher
        .set_response(&urls[2], MockResponse::Status(404))
        .await;

    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("episode.mp3");
    let file = tokio::fs::File::create(&out_path).await.unwrap();
    let job = StitchJob::new("round-trip", urls.clone()).with_sink(file);

    let report = harness.runner.run(job).await;

    assert_eq!(report.outcome, JobOutcome::Forwarded);
    assert_eq!(report.message, "Successfully transcoded and stitched audio");
    assert_eq!(report.job_id, "round-trip");

    // Survivors are stitched in their original order
    let expected: Vec<u8> = [0, 1, 3, 4]
        .iter()
        .flat_map(|&i| urls[i].as_bytes().to_vec())
        .collect();
    assert_eq!(tokio::fs::read(&out_path).await.unwrap(), expected);

    let requests = harness.stitcher.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].input_paths.len(), 4);
    assert_eq!(requests[0].codec, "mp3");
    assert_eq!(requests[0].bitrate_kbps, 128);

    let metrics = report.metrics;
    assert_eq!(metrics.state, SessionState::Complete);
    assert_eq!(metrics.download_success_rate, Some(0.8));
    assert_eq!(metrics.download_failures.len(), 1);
    assert_eq!(metrics.download_failures.get("segment-002"), Some(&urls[2]));
    assert!(metrics.encoding_duration_millis.is_some());
    assert_eq!(metrics.output_size_bytes, Some(expected.len() as u64));
    assert!(metrics.end_time.is_some());

    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_integrity_failure_skips_stitch() {
    let harness = TestHarness::new();
    let urls = fixtures::segment_urls(5);
    harness
        .fetcher
        .set_response(&urls[0], MockResponse::Status(500))
        .await;
    harness
        .fetcher
        .set_response(&urls[4], MockResponse::TransportError("connection reset".to_string()))
        .await;
    let sink = MockSink::new();

    let report = harness
        .runner
        .run(StitchJob::new("low-integrity", urls).with_sink(sink.clone()))
        .await;

    assert!(!report.is_success());
    assert!(report
        .message
        .starts_with("Failed download integrity test, success rate = 0.6"));
    assert!(harness.stitcher.recorded_requests().await.is_empty());
    assert!(sink.contents().is_empty());

    let metrics = report.metrics;
    assert_eq!(metrics.state, SessionState::Error);
    assert_eq!(metrics.download_success_rate, Some(0.6));
    assert_eq!(metrics.download_failures.len(), 2);
    assert_eq!(metrics.encoding_duration_millis, None);
    assert_eq!(metrics.terminal_error.as_deref(), Some(report.message.as_str()));

    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_all_segments_failing() {
    let harness = TestHarness::new();
    let urls = fixtures::segment_urls(3);
    for url in &urls {
        harness
            .fetcher
            .set_response(url, MockResponse::Status(404))
            .await;
    }

    let report = harness.runner.run(StitchJob::new("nothing", urls)).await;

    assert!(!report.is_success());
    assert_eq!(report.metrics.download_success_rate, Some(0.0));
    assert_eq!(report.metrics.download_failures.len(), 3);
}

#[tokio::test]
async fn test_no_sink_stitches_only() {
    let harness = TestHarness::new();

    let report = harness
        .runner
        .run(StitchJob::new("local", fixtures::segment_urls(4)))
        .await;

    assert_eq!(report.outcome, JobOutcome::StitchedOnly);
    assert_eq!(
        report.message,
        "Successfully downloaded and stitched, but not uploaded"
    );
    assert_eq!(report.metrics.state, SessionState::Complete);
    assert_eq!(report.metrics.download_success_rate, Some(1.0));
    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_stitch_timeout_is_a_failure_not_a_job_timeout() {
    let harness = TestHarness::new();
    harness
        .stitcher
        .set_next_error(StitchError::Timeout { timeout_ms: 180_000 })
        .await;

    let report = harness
        .runner
        .run(StitchJob::new("slow-encode", fixtures::segment_urls(3)))
        .await;

    assert_eq!(
        report.outcome,
        JobOutcome::Failed("Stitch timed out after 180000 ms".to_string())
    );
    assert_eq!(report.metrics.state, SessionState::Error);
    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_job_deadline_times_out_and_cleans_up() {
    let harness = TestHarness::with_config(|config| {
        config.session.deadline_ms = 300;
    });
    harness.stitcher.set_delay(Duration::from_secs(30)).await;
    let sink = MockSink::new();

    let started = std::time::Instant::now();
    let report = harness
        .runner
        .run(StitchJob::new("deadline", fixtures::segment_urls(3)).with_sink(sink.clone()))
        .await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        report.outcome,
        JobOutcome::Failed("Job timed out after 300 ms".to_string())
    );

    let metrics = report.metrics;
    assert_eq!(metrics.state, SessionState::TimedOut);
    assert!(metrics.end_time.is_some());
    assert!(metrics.duration_millis >= 300);
    assert!(metrics.terminal_error.unwrap().contains("300"));
    assert_eq!(metrics.download_success_rate, Some(1.0));
    assert_eq!(metrics.encoding_duration_millis, None);
    assert!(sink.contents().is_empty());

    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_sequential_downloads() {
    let harness = TestHarness::with_config(|config| {
        config.download.max_concurrent_downloads = 1;
    });
    harness.fetcher.set_delay(Duration::from_millis(5)).await;
    let urls = fixtures::segment_urls(4);

    let report = harness
        .runner
        .run(StitchJob::new("sequential", urls.clone()))
        .await;

    assert!(report.is_success());
    assert_eq!(harness.fetcher.max_in_flight(), 1);
    assert_eq!(harness.fetcher.requests().await, urls);
}

#[tokio::test]
async fn test_state_changes_are_observable() {
    let harness = TestHarness::new();
    let session = harness.runner.create_session("observed");
    let states = session.subscribe();
    assert_eq!(*states.borrow(), SessionState::Queued);

    let report = harness
        .runner
        .run_with_session(
            StitchJob::new("observed", fixtures::segment_urls(2)),
            session,
        )
        .await;

    assert!(report.is_success());
    assert_eq!(*states.borrow(), SessionState::Complete);
}

#[tokio::test]
async fn test_colliding_job_ids_do_not_share_work_dirs() {
    let harness = TestHarness::new();
    harness.stitcher.set_delay(Duration::from_millis(300)).await;

    // Fails fast while the other job is still stitching
    let doomed: Vec<String> = (0..3)
        .map(|i| format!("https://cdn.example.com/missing/{}.mp3", i))
        .collect();
    for url in &doomed {
        harness
            .fetcher
            .set_response(url, MockResponse::Status(404))
            .await;
    }

    let (failed, stitched) = tokio::join!(
        harness.runner.run(StitchJob::new("ep/1", doomed)),
        harness
            .runner
            .run(StitchJob::new("ep_1", fixtures::segment_urls(3))),
    );

    assert!(failed
        .message
        .starts_with("Failed download integrity test, success rate = 0"));
    assert_eq!(stitched.outcome, JobOutcome::StitchedOnly);
    assert_eq!(stitched.metrics.state, SessionState::Complete);
    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn test_reused_job_id_runs_concurrently() {
    let harness = TestHarness::new();
    harness.stitcher.set_delay(Duration::from_millis(100)).await;

    let (first, second) = tokio::join!(
        harness
            .runner
            .run(StitchJob::new("same", fixtures::segment_urls(2))),
        harness
            .runner
            .run(StitchJob::new("same", fixtures::segment_urls(3))),
    );

    assert_eq!(first.outcome, JobOutcome::StitchedOnly);
    assert_eq!(second.outcome, JobOutcome::StitchedOnly);
    assert!(harness.work_root_is_empty());
}

#[cfg(unix)]
mod ffmpeg_process {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use stitcher_core::{FfmpegStitcher, StitchConfig};

    fn fake_binary(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn is_alive(pid: &str) -> bool {
        std::process::Command::new("kill")
            .args(["-0", pid])
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_job_deadline_kills_ffmpeg() {
        let bin_dir = TempDir::new().unwrap();
        let pid_file = bin_dir.path().join("ffmpeg.pid");
        let ffmpeg = fake_binary(
            bin_dir.path(),
            "ffmpeg",
            &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
        );
        let ffprobe = fake_binary(bin_dir.path(), "ffprobe", "echo 1.0");

        let work_dir = TempDir::new().unwrap();
        let mut config = fixtures::config_in(work_dir.path());
        config.session.deadline_ms = 500;
        config.stitch = StitchConfig::with_paths(ffmpeg, ffprobe).with_timeout_ms(60_000);

        let stitcher = FfmpegStitcher::new(config.stitch.clone());
        let runner = JobRunner::new(config, MockFetcher::new(), stitcher);

        let started = std::time::Instant::now();
        let report = runner
            .run(StitchJob::new("ffmpeg-deadline", fixtures::segment_urls(2)))
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(report.metrics.state, SessionState::TimedOut);
        assert_eq!(
            report.outcome,
            JobOutcome::Failed("Job timed out after 500 ms".to_string())
        );

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        assert!(!pid.is_empty());

        // The child is reaped asynchronously after the kill
        let mut alive = is_alive(pid);
        for _ in 0..50 {
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            alive = is_alive(pid);
        }
        assert!(!alive, "ffmpeg process {} outlived the job deadline", pid);

        let leftovers = std::fs::read_dir(work_dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
