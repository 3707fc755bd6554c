//! Batch runner
//!
//! Drives a job list line by line: parse, resolve, download, transcode. Every
//! line yields exactly one [`BatchEntry`]. A rejected line or a failed job is
//! logged and recorded; the run always moves on to the next line.

use crate::config::Config;
use crate::downloader::StreamDownloader;
use crate::error::{Error, Result};
use crate::job::{JobSpec, Rejection, parse_job_list};
use crate::resolver::{StreamResolver, StreamVariant};
use crate::transcode::{TranscodeMode, TranscodeSpec, Transcoder};
use crate::types::{
    BatchEntry, Event, EventSender, JobOutcome, JobResult, LocalMediaFile, MediaKind, RunReport,
    Stage,
};
use crate::utils::{
    ScopedTimer, format_timestamp, remove_temp_files, temp_file_path, unique_output_path,
};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

/// Buffered events per subscriber before slow receivers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Sequential batch runner
///
/// # Examples
///
/// ```no_run
/// use stream_batch::{BatchRunner, Config, Event};
/// use stream_batch::resolver::YtDlpResolver;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.tools.transcoder_path = "/usr/bin/ffmpeg".into();
///
///     let resolver = YtDlpResolver::from_path().ok_or("yt-dlp not found")?;
///     let runner = BatchRunner::new(config, Arc::new(resolver))?;
///
///     let mut events = runner.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("{:?}", event);
///         }
///     });
///
///     let report = runner.run(Path::new("links.txt")).await?;
///     println!("{} ok, {} failed", report.succeeded(), report.failed());
///     Ok(())
/// }
/// ```
pub struct BatchRunner {
    config: Config,
    resolver: Arc<dyn StreamResolver>,
    downloader: StreamDownloader,
    transcoder: Transcoder,
    event_tx: EventSender,
    /// Temporary files of the job currently running
    in_flight: Mutex<Vec<LocalMediaFile>>,
}

impl BatchRunner {
    /// Create a runner from a validated configuration and a resolver backend
    pub fn new(config: Config, resolver: Arc<dyn StreamResolver>) -> Result<Self> {
        config.validate()?;
        let downloader = StreamDownloader::new(&config)?;
        let transcoder = Transcoder::from_config(&config);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            resolver,
            downloader,
            transcoder,
            event_tx,
            in_flight: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to run events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every line of the job list at `input`
    ///
    /// # Errors
    ///
    /// Only setup failures abort a run: an unreadable input file or output and
    /// temp directories that cannot be created. Per-line problems end up in the
    /// returned [`RunReport`].
    pub async fn run(&self, input: &Path) -> Result<RunReport> {
        info!(input = ?input, resolver = self.resolver.name(), "batch start");
        let content = tokio::fs::read_to_string(input).await.map_err(|e| Error::Config {
            message: format!("failed to read job list {}: {}", input.display(), e),
            key: None,
        })?;
        self.run_lines(&content).await
    }

    /// Run every line of an in-memory job list
    pub async fn run_lines(&self, content: &str) -> Result<RunReport> {
        self.prepare_directories().await?;

        let mut report = RunReport::default();
        for parsed in parse_job_list(content) {
            let entry = match parsed {
                Ok(job) => BatchEntry::Completed(self.run_job(job).await),
                Err(rejection) => {
                    self.record_rejection(&rejection);
                    BatchEntry::Rejected(rejection)
                }
            };
            report.entries.push(entry);
        }

        let (succeeded, failed, rejected) =
            (report.succeeded(), report.failed(), report.rejected());
        info!(succeeded, failed, rejected, "batch complete");
        self.event_tx
            .send(Event::RunComplete {
                succeeded,
                failed,
                rejected,
            })
            .ok();
        Ok(report)
    }

    /// Remove the temporary files of a job whose run was abandoned
    ///
    /// Dropping a [`run`](Self::run) future (on a signal, for example) stops
    /// the current job before its own cleanup happens. Call this afterwards.
    /// Honors `keep_temp_on_failure`. Returns the number of files removed.
    pub async fn discard_interrupted(&self) -> usize {
        let files = std::mem::take(&mut *self.in_flight.lock().await);
        if files.is_empty() {
            return 0;
        }
        if self.config.download.keep_temp_on_failure {
            info!(files = files.len(), "keeping temporary files of interrupted job");
            return 0;
        }
        let removed = remove_temp_files(&files).await;
        info!(removed, "removed temporary files of interrupted job");
        removed
    }

    async fn prepare_directories(&self) -> Result<()> {
        for dir in [self.config.output_dir(), self.config.temp_dir()] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    fn record_rejection(&self, rejection: &Rejection) {
        warn!(
            line = rejection.line,
            raw_line = %rejection.raw_line,
            reason = %rejection.reason,
            "bad line"
        );
        self.event_tx
            .send(Event::LineRejected {
                line: rejection.line,
                raw_line: rejection.raw_line.clone(),
                reason: rejection.reason,
            })
            .ok();
    }

    /// Run one job; never fails, errors become a Failure outcome
    async fn run_job(&self, job: JobSpec) -> JobOutcome {
        let line = job.line();
        let timer = ScopedTimer::start(format!("job line {}", line));
        self.in_flight.lock().await.clear();

        let result = match self.config.timeouts.job_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.process_job(&job))
                .await
                .unwrap_or(Err(Error::Timeout(timeout))),
            None => self.process_job(&job).await,
        };
        let temp_files = std::mem::take(&mut *self.in_flight.lock().await);

        let elapsed = timer.finish();
        self.event_tx
            .send(Event::JobTimed {
                line,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            })
            .ok();

        let result = match result {
            Ok(output) => {
                info!(line, output = ?output, "job complete");
                self.event_tx
                    .send(Event::JobComplete {
                        line,
                        output: output.clone(),
                    })
                    .ok();
                JobResult::Success { output }
            }
            Err(e) => {
                warn!(line, url = %job.url(), error = %e, "job failed");
                if self.config.download.keep_temp_on_failure {
                    info!(line, files = temp_files.len(), "keeping temporary files of failed job");
                } else {
                    remove_temp_files(&temp_files).await;
                }
                self.event_tx
                    .send(Event::JobFailed {
                        line,
                        url: job.url().to_string(),
                        error: e.to_string(),
                    })
                    .ok();
                JobResult::Failure {
                    stage: Stage::of(&e),
                    error: e.to_string(),
                }
            }
        };

        JobOutcome {
            job,
            result,
            elapsed,
        }
    }

    /// Resolve, download and transcode one job
    ///
    /// Every temporary file is tracked in `in_flight` before it is written so
    /// it can be cleaned up after a failure, timeout or interrupt.
    async fn process_job(&self, job: &JobSpec) -> Result<PathBuf> {
        info!(line = job.line(), url = %job.url(), audio_only = job.audio_only(), "job start");
        self.event_tx
            .send(Event::JobStarted {
                line: job.line(),
                url: job.url().to_string(),
                audio_only: job.audio_only(),
            })
            .ok();

        let timestamp = format_timestamp(&Local::now());
        let catalog = self.resolver.resolve(job.url()).await?;
        let selection = catalog.select(job.url(), job.audio_only())?;
        self.event_tx
            .send(Event::Resolved {
                line: job.line(),
                title: catalog.title.clone(),
                audio_quality: selection.audio.quality.clone(),
                video_quality: selection.video.as_ref().map(|v| v.quality.clone()),
            })
            .ok();

        let audio = self.fetch_stream(job, &selection.audio, &timestamp).await?;
        let video = match &selection.video {
            Some(variant) => Some(self.fetch_stream(job, variant, &timestamp).await?),
            None => None,
        };

        let mode = TranscodeMode::for_job(job.audio_only());
        let output_path = unique_output_path(
            self.config.output_dir(),
            &catalog.title,
            &timestamp,
            job.line(),
            mode.output_extension(),
        )
        .await?;
        let spec = match video {
            Some(video) => {
                TranscodeSpec::mux(video, audio, selection.audio_bitrate.clone(), output_path)
            }
            None => TranscodeSpec::audio_only(audio, selection.audio_bitrate.clone(), output_path),
        };

        let output = self
            .transcoder
            .transcode(job.line(), spec, &self.event_tx)
            .await?;
        Ok(output.path)
    }

    async fn fetch_stream(
        &self,
        job: &JobSpec,
        variant: &StreamVariant,
        timestamp: &str,
    ) -> Result<LocalMediaFile> {
        let kind = MediaKind::from(variant.kind);
        let dest = temp_file_path(
            self.config.temp_dir(),
            kind,
            timestamp,
            job.line(),
            &variant.extension,
        );
        self.in_flight
            .lock()
            .await
            .push(LocalMediaFile::new(&dest, kind));

        let file = self
            .downloader
            .fetch(job.line(), variant, &dest, &self.event_tx)
            .await?;
        Ok(file)
    }
}
