//! Error types for stream-batch
//!
//! Each pipeline stage has its own error enum so callers can tell where a job
//! failed:
//! - [`ResolutionError`] - looking up the variant catalog for a URL
//! - [`DownloadError`] - fetching a selected variant to a temporary file
//! - [`TranscodeError`] - running the external transcoder
//!
//! All of them convert into the top-level [`Error`], which is what the batch
//! runner records as a job failure.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for stream-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stream-batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "transcoder_path")
        key: Option<String>,
    },

    /// Looking up the stream catalog failed
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Fetching a stream failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// The transcoder step failed
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// A whole job exceeded its time budget
    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (config files)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while resolving a URL into a variant catalog
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The resolver binary could not be started
    #[error("failed to execute resolver {binary}: {reason}")]
    Spawn {
        /// Path of the resolver binary
        binary: PathBuf,
        /// Underlying spawn error
        reason: String,
    },

    /// The resolver ran but reported a failure (unreachable source, not a media page, ...)
    #[error("resolver failed for {url}: {message}")]
    ResolverFailed {
        /// The URL being resolved
        url: String,
        /// Message reported by the resolver (usually its stderr)
        message: String,
    },

    /// The resolver output could not be interpreted
    #[error("invalid resolver output for {url}: {reason}")]
    InvalidResponse {
        /// The URL being resolved
        url: String,
        /// What was wrong with the output
        reason: String,
    },

    /// Resolution exceeded the configured timeout
    #[error("resolving {url} timed out after {timeout:?}")]
    TimedOut {
        /// The URL being resolved
        url: String,
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// The catalog has no usable audio stream
    #[error("no audio stream available for {url}")]
    NoAudioVariant {
        /// The URL whose catalog lacked audio
        url: String,
    },

    /// A muxed job needs a video stream but the catalog has none
    #[error("no video stream available for {url}")]
    NoVideoVariant {
        /// The URL whose catalog lacked video
        url: String,
    },
}

/// Errors raised while downloading a stream variant
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("failed to fetch {url}: {source}")]
    Transport {
        /// The URL being fetched
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL being fetched
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// Writing the temporary file failed
    #[error("failed to write {path}: {source}")]
    Io {
        /// The destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The download exceeded the configured timeout
    #[error("download of {url} timed out after {timeout:?}")]
    TimedOut {
        /// The URL being fetched
        url: String,
        /// The timeout that was exceeded
        timeout: Duration,
    },
}

/// Errors raised by the transcode step
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The transcoder process could not be started
    #[error("failed to execute transcoder {binary}: {source}")]
    Spawn {
        /// Path of the transcoder binary
        binary: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The transcoder exited with a non-zero status
    #[error("transcoder exited with {status} while writing {output}")]
    Failed {
        /// Exit status reported by the process
        status: ExitStatus,
        /// The output file the transcoder was asked to write
        output: PathBuf,
    },

    /// Reading the transcoder output or waiting on it failed
    #[error("transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transcoder exceeded the configured timeout and was killed
    #[error("transcoder timed out after {0:?}")]
    TimedOut(Duration),
}

impl TranscodeError {
    /// Exit code of the transcoder, if it ran to completion with a failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TranscodeError::Failed { status, .. } => status.code(),
            _ => None,
        }
    }
}
