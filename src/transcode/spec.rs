//! Transcoder invocation builder
//!
//! [`TranscodeSpec`] holds everything needed to call the transcoder and turns
//! it into the exact positional argument list. Nothing here spawns a process.

use crate::resolver::CanonicalBitrate;
use crate::types::{LocalMediaFile, MediaKind};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Video codec used when muxing
pub const MUX_VIDEO_CODEC: &str = "hevc_nvenc";
/// Encoder preset used when muxing
pub const MUX_PRESET: &str = "fast";
/// Video profile used when muxing
pub const MUX_VIDEO_PROFILE: &str = "main";
/// Audio codec used when muxing
pub const MUX_AUDIO_CODEC: &str = "aac";

/// What the transcoder produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeMode {
    /// One video and one audio stream into a single container
    MuxAv,
    /// Re-encode audio only
    AudioOnly,
}

impl TranscodeMode {
    /// Mode for a job
    pub fn for_job(audio_only: bool) -> Self {
        if audio_only {
            TranscodeMode::AudioOnly
        } else {
            TranscodeMode::MuxAv
        }
    }

    /// Extension of the final file
    pub fn output_extension(self) -> &'static str {
        match self {
            TranscodeMode::MuxAv => "mkv",
            TranscodeMode::AudioOnly => "mp3",
        }
    }
}

/// Input files of a transcode, shaped by mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscodeInputs {
    /// Separate video and audio streams to combine
    MuxAv {
        /// Temporary video stream
        video: LocalMediaFile,
        /// Temporary audio stream
        audio: LocalMediaFile,
    },
    /// A single audio stream
    AudioOnly {
        /// Temporary audio stream
        audio: LocalMediaFile,
    },
}

/// Everything needed for one transcoder run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscodeSpec {
    inputs: TranscodeInputs,
    audio_bitrate: CanonicalBitrate,
    output_path: PathBuf,
}

impl TranscodeSpec {
    /// Combine `video` and `audio` into `output_path`
    pub fn mux(
        video: LocalMediaFile,
        audio: LocalMediaFile,
        audio_bitrate: CanonicalBitrate,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inputs: TranscodeInputs::MuxAv { video, audio },
            audio_bitrate,
            output_path: output_path.into(),
        }
    }

    /// Re-encode `audio` into `output_path`
    pub fn audio_only(
        audio: LocalMediaFile,
        audio_bitrate: CanonicalBitrate,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inputs: TranscodeInputs::AudioOnly { audio },
            audio_bitrate,
            output_path: output_path.into(),
        }
    }

    /// Mode implied by the inputs
    pub fn mode(&self) -> TranscodeMode {
        match self.inputs {
            TranscodeInputs::MuxAv { .. } => TranscodeMode::MuxAv,
            TranscodeInputs::AudioOnly { .. } => TranscodeMode::AudioOnly,
        }
    }

    /// Input files
    pub fn inputs(&self) -> &TranscodeInputs {
        &self.inputs
    }

    /// Audio bitrate passed as `-b:a`
    pub fn audio_bitrate(&self) -> &CanonicalBitrate {
        &self.audio_bitrate
    }

    /// Path of the final file
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The audio input
    pub fn audio(&self) -> &LocalMediaFile {
        match &self.inputs {
            TranscodeInputs::MuxAv { audio, .. } | TranscodeInputs::AudioOnly { audio } => audio,
        }
    }

    /// The video input, for muxed runs
    pub fn video(&self) -> Option<&LocalMediaFile> {
        match &self.inputs {
            TranscodeInputs::MuxAv { video, .. } => Some(video),
            TranscodeInputs::AudioOnly { .. } => None,
        }
    }

    /// Temporary files to delete after a successful run
    ///
    /// The audio input always, the video input only when muxing.
    pub fn temporary_inputs(&self) -> Vec<LocalMediaFile> {
        let mut files = vec![self.audio().clone()];
        files.extend(self.video().cloned());
        files
    }

    /// The final file this run produces
    pub fn output_file(&self) -> LocalMediaFile {
        LocalMediaFile::new(&self.output_path, MediaKind::Final)
    }

    /// Positional arguments for the transcoder
    ///
    /// Muxed:
    /// `-y -i <video> -i <audio> -c:v hevc_nvenc -preset fast -profile:v main -c:a aac -b:a <bitrate> <output>`
    ///
    /// Audio only:
    /// `-y -i <audio> -b:a <bitrate> <output>`
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into()];
        match &self.inputs {
            TranscodeInputs::MuxAv { video, audio } => {
                args.extend([
                    "-i".into(),
                    video.path.clone().into_os_string(),
                    "-i".into(),
                    audio.path.clone().into_os_string(),
                    "-c:v".into(),
                    MUX_VIDEO_CODEC.into(),
                    "-preset".into(),
                    MUX_PRESET.into(),
                    "-profile:v".into(),
                    MUX_VIDEO_PROFILE.into(),
                    "-c:a".into(),
                    MUX_AUDIO_CODEC.into(),
                ]);
            }
            TranscodeInputs::AudioOnly { audio } => {
                args.extend(["-i".into(), audio.path.clone().into_os_string()]);
            }
        }
        args.extend([
            "-b:a".into(),
            self.audio_bitrate.as_str().into(),
            self.output_path.clone().into_os_string(),
        ]);
        args
    }
}
