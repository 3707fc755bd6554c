//! Stream downloads
//!
//! Fetches a selected [`StreamVariant`] over HTTP into a temporary file,
//! reporting start, progress and completion on the event channel.

use crate::config::Config;
use crate::error::{DownloadError, Error, Result};
use crate::resolver::{StreamKind, StreamVariant};
use crate::types::{Event, EventSender, LocalMediaFile, MediaKind};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Progress events are emitted each time this many percent more has arrived
const PROGRESS_STEP_PERCENT: u64 = 10;

impl From<StreamKind> for MediaKind {
    fn from(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Audio => MediaKind::Audio,
            StreamKind::Video => MediaKind::Video,
        }
    }
}

/// HTTP downloader for stream variants
///
/// Failures are never retried here; the job that requested the stream fails.
pub struct StreamDownloader {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl StreamDownloader {
    /// Create a downloader using the user agent and timeout from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.download.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("user_agent".to_string()),
            })?;

        Ok(Self {
            client,
            timeout: config.timeouts.download_timeout,
        })
    }

    /// Download `variant` to `dest`
    ///
    /// On failure any partially written file at `dest` is removed.
    pub async fn fetch(
        &self,
        job_line: usize,
        variant: &StreamVariant,
        dest: &Path,
        events: &EventSender,
    ) -> std::result::Result<LocalMediaFile, DownloadError> {
        let kind = MediaKind::from(variant.kind);
        info!(line = job_line, %kind, quality = %variant.quality, "download start");
        events
            .send(Event::DownloadStarted {
                line: job_line,
                kind,
            })
            .ok();

        let transfer = self.transfer(job_line, kind, variant, dest, events);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, transfer)
                .await
                .unwrap_or_else(|_| {
                    Err(DownloadError::TimedOut {
                        url: variant.download_url.to_string(),
                        timeout,
                    })
                }),
            None => transfer.await,
        };

        match result {
            Ok(bytes) => {
                info!(line = job_line, %kind, bytes, "download done");
                events
                    .send(Event::DownloadComplete {
                        line: job_line,
                        kind,
                        bytes,
                    })
                    .ok();
                Ok(LocalMediaFile::new(dest, kind))
            }
            Err(e) => {
                discard_partial(dest).await;
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        job_line: usize,
        kind: MediaKind,
        variant: &StreamVariant,
        dest: &Path,
        events: &EventSender,
    ) -> std::result::Result<u64, DownloadError> {
        let url = variant.download_url.as_str();
        let transport = |source: reqwest::Error| DownloadError::Transport {
            url: url.to_string(),
            source,
        };
        let io = |source: std::io::Error| DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        };

        // Source-supplied headers take precedence over the client defaults
        let request = variant
            .http_headers
            .iter()
            .fold(self.client.get(variant.download_url.clone()), |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            });
        let response = request
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut file = tokio::fs::File::create(dest).await.map_err(io)?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        let mut next_report = PROGRESS_STEP_PERCENT;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await.map_err(io)?;
            written += chunk.len() as u64;

            if let Some(total) = total {
                let percent = written.saturating_mul(100) / total;
                if percent >= next_report {
                    events
                        .send(Event::DownloadProgress {
                            line: job_line,
                            kind,
                            percent: percent.min(100) as f32,
                        })
                        .ok();
                    next_report = (percent / PROGRESS_STEP_PERCENT + 1) * PROGRESS_STEP_PERCENT;
                }
            }
        }

        file.flush().await.map_err(io)?;
        debug!(?dest, written, "stream written");
        Ok(written)
    }
}

async fn discard_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => debug!(?dest, "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(?dest, error = %e, "failed to remove partial download"),
    }
}
