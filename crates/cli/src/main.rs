mod metrics;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stitcher_core::{
    load_config, load_default_config, validate_config, Config, FfmpegStitcher, HttpFetcher,
    JobRunner, StitchJob, Stitcher,
};

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "stitcher.toml";

/// Download audio segments and stitch them into one re-encoded file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Segment URLs in playback order.
    #[arg(required = true, num_args = 1..)]
    urls: Vec<String>,

    /// Configuration file. Defaults to ./stitcher.toml when present.
    #[arg(short, long, env = "STITCHER_CONFIG")]
    config: Option<PathBuf>,

    /// Write the stitched audio to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Job identifier, generated when omitted.
    #[arg(long)]
    job_id: Option<String>,

    /// Print Prometheus metrics after the job report.
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("STITCHER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout carries the job report
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
            load_config(Path::new(DEFAULT_CONFIG_PATH))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH))
        }
        None => {
            info!("No configuration file, using defaults");
            load_default_config().context("Failed to load default config")
        }
    }
}

/// Runs one job and prints its report. Returns whether the job succeeded.
async fn run(args: Args) -> Result<bool> {
    let config = resolve_config(args.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Work directory: {:?}", config.download.work_dir);
    info!(
        "Stitch timeout: {} ms, job deadline: {} ms",
        config.stitch.timeout_ms, config.session.deadline_ms
    );

    let stitcher = FfmpegStitcher::new(config.stitch.clone());
    stitcher
        .validate()
        .await
        .context("ffmpeg and ffprobe must be installed")?;

    let fetcher = HttpFetcher::new(&config.download).context("Failed to create HTTP client")?;
    let runner = JobRunner::new(config, fetcher, stitcher);

    let job = match args.job_id {
        Some(job_id) => StitchJob::new(job_id, args.urls),
        None => StitchJob::with_generated_id(args.urls),
    };
    let job = match &args.output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            job.with_sink(file)
        }
        None => job,
    };

    let report = runner.run(job).await;

    if !report.is_success() {
        if let Some(path) = &args.output {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize job report")?
    );
    if args.metrics {
        print!("{}", metrics::encode_metrics()?);
    }

    Ok(report.is_success())
}
