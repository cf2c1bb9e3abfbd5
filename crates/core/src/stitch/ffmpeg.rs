//! FFmpeg-based stitcher implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics;

use super::config::StitchConfig;
use super::error::StitchError;
use super::traits::Stitcher;
use super::types::{StitchOutput, StitchRequest};

/// Captured result of a finished process.
struct ProcessOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// How the ffmpeg run ended.
enum Finish {
    Exited(std::io::Result<ProcessOutput>),
    TimedOut,
    Cancelled,
}

/// FFmpeg-based stitcher implementation.
pub struct FfmpegStitcher {
    config: StitchConfig,
}

impl FfmpegStitcher {
    /// Creates a new FFmpeg stitcher with the given configuration.
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// Creates a stitcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(StitchConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Builds the ffmpeg argument list for a request.
    ///
    /// Arguments are passed to the process directly, never through a shell.
    pub fn build_args(&self, request: &StitchRequest) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ];

        // One input stream per file
        for input in &request.input_paths {
            args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);
        }

        // Concat audio only, drop any video
        args.extend([
            "-filter_complex".to_string(),
            request.filter_graph(),
            "-map".to_string(),
            "[output]".to_string(),
        ]);

        // Strip input metadata, then encode
        args.extend([
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-c:a".to_string(),
            request.codec.clone(),
            "-b:a".to_string(),
            format!("{}k", request.bitrate_kbps),
        ]);

        for (key, value) in &request.metadata {
            args.extend(["-metadata".to_string(), format!("{}={}", key, value)]);
        }

        args.push(request.output_path.to_string_lossy().to_string());
        args
    }

    /// Builds the ffprobe argument list for a duration query.
    fn build_probe_args(path: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            path.to_string_lossy().to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-v".to_string(),
            "quiet".to_string(),
            "-of".to_string(),
            "csv=p=0".to_string(),
        ]
    }

    /// Parses the single number ffprobe prints for a duration query.
    fn parse_duration(output: &str) -> Result<f64, StitchError> {
        let trimmed = output.trim();
        let duration = trimmed
            .parse::<f64>()
            .map_err(|e| StitchError::ParseError {
                reason: format!("'{}' is not a duration: {}", trimmed, e),
            })?;

        if !duration.is_finite() || duration < 0.0 {
            return Err(StitchError::ParseError {
                reason: format!("'{}' is not a valid duration", trimmed),
            });
        }
        Ok(duration)
    }

    fn map_spawn_error(&self, e: std::io::Error) -> StitchError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StitchError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            StitchError::Io(e)
        }
    }

    /// Runs ffmpeg under the timeout and cancellation token.
    async fn run_stitch(
        &self,
        request: &StitchRequest,
        cancel: &CancellationToken,
    ) -> Result<StitchOutput, StitchError> {
        if request.input_paths.is_empty() {
            return Err(StitchError::NoInputs);
        }

        let start = Instant::now();

        // Ensure output directory exists
        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                StitchError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(request);
        debug!(
            inputs = request.input_paths.len(),
            output = %request.output_path.display(),
            "Spawning ffmpeg"
        );

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let timeout_ms = self.config.timeout_ms;

        let finish = {
            let wait = wait_with_output(&mut child, stdout, stderr);
            tokio::select! {
                result = wait => Finish::Exited(result),
                _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => Finish::TimedOut,
                _ = cancel.cancelled() => Finish::Cancelled,
            }
        };

        let output = match finish {
            Finish::Exited(result) => result?,
            Finish::TimedOut => {
                error!(timeout_ms = timeout_ms, "Stitching timed out, killing ffmpeg");
                kill_child(&mut child).await;
                remove_partial_output(&request.output_path).await;
                metrics::STITCH_TIMEOUTS.inc();
                return Err(StitchError::Timeout { timeout_ms });
            }
            Finish::Cancelled => {
                warn!("Stitching cancelled, killing ffmpeg");
                kill_child(&mut child).await;
                remove_partial_output(&request.output_path).await;
                return Err(StitchError::Cancelled);
            }
        };

        let stderr = output.stderr.trim();
        if !output.status.success() || !stderr.is_empty() {
            let detail = if stderr.is_empty() {
                output.stdout.trim().to_string()
            } else {
                stderr.to_string()
            };
            warn!(code = ?output.status.code(), detail = %detail, "Failure to stitch audio");
            remove_partial_output(&request.output_path).await;
            return Err(StitchError::conversion_failed(
                format!("FFmpeg exited with code {:?}: {}", output.status.code(), detail),
                if detail.is_empty() { None } else { Some(detail) },
            ));
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&request.output_path)
            .await
            .map_err(|_| StitchError::conversion_failed("Output file not created", None))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            inputs = request.input_paths.len(),
            size_bytes = output_meta.len(),
            elapsed_ms = elapsed_ms,
            "Audio stitching complete"
        );

        Ok(StitchOutput {
            output_path: request.output_path.clone(),
            output_size_bytes: output_meta.len(),
            elapsed_ms,
        })
    }
}

/// Waits for the child while draining both pipes.
async fn wait_with_output(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> std::io::Result<ProcessOutput> {
    let (status, stdout, stderr) =
        tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))?;
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
    })
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill ffmpeg process");
    }
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

#[async_trait]
impl Stitcher for FfmpegStitcher {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn stitch(
        &self,
        request: &StitchRequest,
        cancel: &CancellationToken,
    ) -> Result<StitchOutput, StitchError> {
        let result = self.run_stitch(request, cancel).await;
        let label = match &result {
            Ok(_) => "success",
            Err(StitchError::Timeout { .. }) => "timeout",
            Err(StitchError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::STITCHES_TOTAL.with_label_values(&[label]).inc();
        result
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, StitchError> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(Self::build_probe_args(path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StitchError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    StitchError::Io(e)
                }
            })?;

        if !output.status.success() {
            error!(path = %path.display(), "Duration estimation failure");
            return Err(StitchError::probe_failed(format!(
                "ffprobe exited with code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn validate(&self) -> Result<(), StitchError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            return Err(self.map_spawn_error(e));
        }

        // Check ffprobe exists
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(StitchError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(StitchError::Io(e));
        }

        Ok(())
    }
}
