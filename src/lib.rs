//! # stream-batch
//!
//! Batch downloader for streaming sites. Reads a job list, resolves the best
//! audio (and optionally video) stream of every URL, downloads the streams and
//! hands them to an external ffmpeg-compatible transcoder.
//!
//! ## Design Philosophy
//!
//! - **One job never sinks the batch** - every failure is recorded and the run
//!   moves on to the next line
//! - **Pluggable resolution** - anything implementing [`StreamResolver`] can
//!   provide the stream catalog; [`resolver::YtDlpResolver`] wraps `yt-dlp`
//! - **Event-driven** - consumers subscribe to [`Event`]s instead of parsing logs
//!
//! ## Job list format
//!
//! One job per line, either `<URL>` (video muxed with audio into `.mkv`) or
//! `a <URL>` (audio only, `.mp3`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use stream_batch::{BatchRunner, Config};
//! use stream_batch::resolver::YtDlpResolver;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.tools.transcoder_path = "/usr/bin/ffmpeg".into();
//!
//!     let resolver = YtDlpResolver::from_path().ok_or("yt-dlp not found")?;
//!     let runner = BatchRunner::new(config, Arc::new(resolver))?;
//!
//!     // Subscribe to events
//!     let mut events = runner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = runner.run(Path::new("links.txt")).await?;
//!     println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Sequential job runner
pub mod batch;
/// Configuration types
pub mod config;
/// HTTP stream downloads
pub mod downloader;
/// Error types
pub mod error;
/// Job list parsing
pub mod job;
/// Stream catalog resolution and selection
pub mod resolver;
/// External transcoder invocation
pub mod transcode;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::BatchRunner;
pub use config::{Config, DownloadConfig, TimeoutConfig, ToolsConfig};
pub use downloader::StreamDownloader;
pub use error::{DownloadError, Error, ResolutionError, Result, TranscodeError};
pub use job::{JobSpec, Rejection, RejectionReason};
pub use resolver::{StreamResolver, StreamVariant, VariantCatalog};
pub use transcode::{TranscodeMode, TranscodeSpec, Transcoder};
pub use types::{
    BatchEntry, Event, JobOutcome, JobResult, LocalMediaFile, MediaKind, RunReport, Stage,
};

/// Wait for a termination signal
///
/// - **Unix:** SIGTERM or SIGINT, falling back to `ctrl_c` if registration fails.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn wait_for_signal() {
    imp::wait_for_signal().await
}

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{SignalKind, signal};

    pub(super) async fn wait_for_signal() {
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    pub(super) async fn wait_for_signal() {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C signal"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
        }
    }
}
