//! Core types and events for stream-batch

use crate::error::Error;
use crate::job::{JobSpec, Rejection, RejectionReason};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;

/// Sending half of the event channel every pipeline stage reports to
pub type EventSender = broadcast::Sender<Event>;

/// Role of a file produced during a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Temporary audio stream
    Audio,
    /// Temporary video stream
    Video,
    /// Durable transcoder output
    Final,
}

impl MediaKind {
    /// Whether files of this kind are removed once the job is done
    pub fn is_temporary(self) -> bool {
        !matches!(self, MediaKind::Final)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
            MediaKind::Final => f.write_str("final"),
        }
    }
}

/// A media file on local disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMediaFile {
    /// Location of the file
    pub path: PathBuf,
    /// What the file holds
    pub kind: MediaKind,
}

impl LocalMediaFile {
    /// Create a new file descriptor
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Pipeline stage a job failed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Catalog lookup and stream selection
    Resolve,
    /// Stream download
    Download,
    /// External transcoder run
    Transcode,
}

impl Stage {
    /// Stage an error originated from, if it belongs to one
    pub fn of(error: &Error) -> Option<Stage> {
        match error {
            Error::Resolution(_) => Some(Stage::Resolve),
            Error::Download(_) => Some(Stage::Download),
            Error::Transcode(_) => Some(Stage::Transcode),
            _ => None,
        }
    }
}

/// Event emitted while a batch runs
///
/// Subscribers receive every event in order. Transcoder output is forwarded
/// line by line as [`Event::TranscoderOutput`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A line was skipped
    LineRejected {
        /// 1-based line number
        line: usize,
        /// The raw line
        raw_line: String,
        /// Why it was skipped
        reason: RejectionReason,
    },

    /// A job started
    JobStarted {
        /// 1-based line number
        line: usize,
        /// Source URL
        url: String,
        /// Whether only audio is produced
        audio_only: bool,
    },

    /// Streams were selected for a job
    Resolved {
        /// 1-based line number
        line: usize,
        /// Title reported by the resolver
        title: String,
        /// Quality label of the chosen audio stream
        audio_quality: String,
        /// Quality label of the chosen video stream (muxed jobs only)
        #[serde(skip_serializing_if = "Option::is_none")]
        video_quality: Option<String>,
    },

    /// A stream download started
    DownloadStarted {
        /// 1-based line number
        line: usize,
        /// Which stream
        kind: MediaKind,
    },

    /// Download progress (emitted every 10% when the size is known)
    DownloadProgress {
        /// 1-based line number
        line: usize,
        /// Which stream
        kind: MediaKind,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
    },

    /// A stream download finished
    DownloadComplete {
        /// 1-based line number
        line: usize,
        /// Which stream
        kind: MediaKind,
        /// Bytes written
        bytes: u64,
    },

    /// The transcoder was launched
    TranscodeStarted {
        /// 1-based line number
        line: usize,
        /// Output file being written
        output: PathBuf,
    },

    /// One line of combined transcoder stdout/stderr
    TranscoderOutput {
        /// 1-based line number of the job
        line: usize,
        /// The output text, without line terminator
        text: String,
    },

    /// Duration of the resolve + download + transcode sequence of one job
    JobTimed {
        /// 1-based line number
        line: usize,
        /// Wall-clock time in milliseconds
        elapsed_ms: u64,
    },

    /// A job produced its output file
    JobComplete {
        /// 1-based line number
        line: usize,
        /// The final file
        output: PathBuf,
    },

    /// A job failed
    JobFailed {
        /// 1-based line number
        line: usize,
        /// Source URL
        url: String,
        /// Error message
        error: String,
    },

    /// Every line has been processed
    RunComplete {
        /// Number of successful jobs
        succeeded: usize,
        /// Number of failed jobs
        failed: usize,
        /// Number of rejected lines
        rejected: usize,
    },
}

/// How a job ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    /// The final file was written
    Success {
        /// Path of the final file
        output: PathBuf,
    },
    /// One of the stages failed
    Failure {
        /// Stage the error came from (None for job-level errors such as a timeout)
        stage: Option<Stage>,
        /// Error message
        error: String,
    },
}

/// Result of running one job
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobOutcome {
    /// The job that ran
    pub job: JobSpec,
    /// How it ended
    pub result: JobResult,
    /// Time spent on resolve + download + transcode
    pub elapsed: Duration,
}

impl JobOutcome {
    /// Whether the job produced its output
    pub fn is_success(&self) -> bool {
        matches!(self.result, JobResult::Success { .. })
    }
}

/// One entry per input line
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEntry {
    /// The line could not be parsed
    Rejected(Rejection),
    /// The line was run as a job
    Completed(JobOutcome),
}

/// Everything a batch run produced, in input order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per input line
    pub entries: Vec<BatchEntry>,
}

impl RunReport {
    /// Iterate over job outcomes, skipping rejected lines
    pub fn outcomes(&self) -> impl Iterator<Item = &JobOutcome> {
        self.entries.iter().filter_map(|entry| match entry {
            BatchEntry::Completed(outcome) => Some(outcome),
            BatchEntry::Rejected(_) => None,
        })
    }

    /// Iterate over rejected lines
    pub fn rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.entries.iter().filter_map(|entry| match entry {
            BatchEntry::Rejected(rejection) => Some(rejection),
            BatchEntry::Completed(_) => None,
        })
    }

    /// Number of jobs that produced output
    pub fn succeeded(&self) -> usize {
        self.outcomes().filter(|o| o.is_success()).count()
    }

    /// Number of jobs that failed
    pub fn failed(&self) -> usize {
        self.outcomes().filter(|o| !o.is_success()).count()
    }

    /// Number of rejected lines
    pub fn rejected(&self) -> usize {
        self.rejections().count()
    }

    /// True if any job failed or any line was rejected
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.rejected() > 0
    }
}
