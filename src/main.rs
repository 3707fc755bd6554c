use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use stream_batch::resolver::YtDlpResolver;
use stream_batch::{BatchRunner, Config, wait_for_signal};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Every job succeeded
const EXIT_OK: u8 = 0;
/// At least one job failed or one line was rejected
const EXIT_JOB_FAILURES: u8 = 1;
/// The run could not start
const EXIT_STARTUP: u8 = 2;
/// Interrupted by a signal
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "stream-batch")]
#[command(about = "Download and convert every URL of a job list", version)]
struct Args {
    /// Job list: one `<URL>` or `a <URL>` per line
    input: PathBuf,

    /// ffmpeg-compatible transcoder executable
    #[arg(short, long)]
    transcoder: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for finished files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory for temporary stream files
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// yt-dlp compatible resolver executable (searched in PATH if omitted)
    #[arg(long)]
    resolver: Option<PathBuf>,

    /// Leave temporary files of failed jobs on disk
    #[arg(long)]
    keep_temp_on_failure: bool,
}

impl Args {
    /// Load the config file, if any, and apply command-line overrides
    fn into_config(self) -> stream_batch::Result<(PathBuf, Config)> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(transcoder) = self.transcoder {
            config.tools.transcoder_path = transcoder;
        }
        if let Some(resolver) = self.resolver {
            config.tools.resolver_path = Some(resolver);
        }
        if let Some(output_dir) = self.output_dir {
            config.download.output_dir = output_dir;
        }
        if let Some(temp_dir) = self.temp_dir {
            config.download.temp_dir = temp_dir;
        }
        if self.keep_temp_on_failure {
            config.download.keep_temp_on_failure = true;
        }

        Ok((self.input, config))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let (input, config) = match args.into_config() {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let runner = match YtDlpResolver::from_config(&config)
        .and_then(|resolver| BatchRunner::new(config, Arc::new(resolver)))
    {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "could not start");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    // The run future is dropped before cleanup so its child processes are killed first
    let finished = tokio::select! {
        result = runner.run(&input) => Some(result),
        _ = wait_for_signal() => None,
    };
    let Some(report) = finished else {
        warn!("interrupted, abandoning remaining jobs");
        runner.discard_interrupted().await;
        return ExitCode::from(EXIT_INTERRUPTED);
    };

    match report {
        Ok(report) => {
            info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                rejected = report.rejected(),
                "summary"
            );
            if report.has_failures() {
                ExitCode::from(EXIT_JOB_FAILURES)
            } else {
                ExitCode::from(EXIT_OK)
            }
        }
        Err(e) => {
            error!(input = ?input, error = %e, "run aborted");
            ExitCode::from(EXIT_STARTUP)
        }
    }
}
