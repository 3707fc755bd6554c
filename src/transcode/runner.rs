//! Runs the external transcoder and forwards its output

use super::spec::TranscodeSpec;
use crate::config::Config;
use crate::error::TranscodeError;
use crate::types::{Event, EventSender, LocalMediaFile};
use crate::utils::remove_temp_files;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{info, warn};

/// Line separators in transcoder output; ffmpeg redraws its progress line with `\r`
const LINE_DELIMITERS: &[u8] = b"\r\n";

type LineStream = BoxStream<'static, std::io::Result<String>>;

/// Transcoder at a caller-supplied path (ffmpeg compatible)
///
/// # Examples
///
/// ```no_run
/// use stream_batch::resolver::CanonicalBitrate;
/// use stream_batch::transcode::{TranscodeSpec, Transcoder};
/// use stream_batch::types::{LocalMediaFile, MediaKind};
/// use tokio::sync::broadcast;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transcoder = Transcoder::new("/usr/bin/ffmpeg".into());
/// let spec = TranscodeSpec::audio_only(
///     LocalMediaFile::new("audio.m4a", MediaKind::Audio),
///     CanonicalBitrate::from_label("128kbps").unwrap(),
///     "Song_2024-01-01_12-00-00.mp3",
/// );
///
/// let (events, _rx) = broadcast::channel(1024);
/// let output = transcoder.transcode(1, spec, &events).await?;
/// println!("wrote {}", output.path.display());
/// # Ok(())
/// # }
/// ```
pub struct Transcoder {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl Transcoder {
    /// Create a transcoder for the binary at `binary_path`
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Create a transcoder from the configured path and timeout
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tools.transcoder_path.clone()).with_timeout(config.timeouts.transcode_timeout)
    }

    /// Limit how long one run may take; the process is killed when exceeded
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the transcoder for `spec`
    ///
    /// Standard output and standard error are read together and every line is
    /// forwarded as [`Event::TranscoderOutput`] while the process runs. After a
    /// zero exit the temporary inputs are deleted (audio always, video when
    /// muxing) and the final file is returned. After a non-zero exit the inputs
    /// and any partially written output are left in place.
    pub async fn transcode(
        &self,
        job_line: usize,
        spec: TranscodeSpec,
        events: &EventSender,
    ) -> Result<LocalMediaFile, TranscodeError> {
        let output = spec.output_file();
        info!(
            line = job_line,
            mode = ?spec.mode(),
            bitrate = %spec.audio_bitrate(),
            output = ?output.path,
            "transcode start"
        );
        events
            .send(Event::TranscodeStarted {
                line: job_line,
                output: output.path.clone(),
            })
            .ok();

        let status = self.run(job_line, &spec, events).await?;
        if !status.success() {
            warn!(line = job_line, %status, "transcoder failed");
            return Err(TranscodeError::Failed {
                status,
                output: output.path,
            });
        }

        remove_temp_files(&spec.temporary_inputs()).await;
        info!(line = job_line, output = ?output.path, "transcode done");
        Ok(output)
    }

    async fn run(
        &self,
        job_line: usize,
        spec: &TranscodeSpec,
        events: &EventSender,
    ) -> Result<ExitStatus, TranscodeError> {
        let mut child = Command::new(&self.binary_path)
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                binary: self.binary_path.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(output_lines);
        let stderr = child.stderr.take().map(output_lines);
        let merged = stream::select(
            stdout.unwrap_or_else(|| stream::empty().boxed()),
            stderr.unwrap_or_else(|| stream::empty().boxed()),
        );

        let completion = async {
            forward_lines(job_line, merged, events).await?;
            child.wait().await
        };

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, completion).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(line = job_line, ?timeout, "transcoder timed out, killing");
                    child.start_kill().ok();
                    return Err(TranscodeError::TimedOut(timeout));
                }
            },
            None => completion.await?,
        };
        Ok(status)
    }
}

/// Split a child pipe into lines on `\n` or `\r`
fn output_lines<R>(pipe: R) -> LineStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let codec = AnyDelimiterCodec::new(LINE_DELIMITERS.to_vec(), b"\n".to_vec());
    FramedRead::new(pipe, codec)
        .map(|frame| {
            frame
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(std::io::Error::other)
        })
        .boxed()
}

async fn forward_lines(
    job_line: usize,
    mut lines: impl futures::Stream<Item = std::io::Result<String>> + Unpin,
    events: &EventSender,
) -> std::io::Result<()> {
    while let Some(text) = lines.next().await {
        let text = text?;
        let text = text.trim_end();
        if text.is_empty() {
            continue;
        }
        info!(target: "transcoder", line = job_line, "{}", text);
        events
            .send(Event::TranscoderOutput {
                line: job_line,
                text: text.to_string(),
            })
            .ok();
    }
    Ok(())
}
