//! Transcode orchestration
//!
//! Two halves, kept apart so argument construction can be tested without a
//! process:
//!
//! - [`TranscodeSpec`] describes one run and builds the argument list
//! - [`Transcoder`] spawns the external tool, streams its output and cleans up
//!   the temporary inputs after a successful run

mod runner;
mod spec;

pub use runner::Transcoder;
pub use spec::{
    MUX_AUDIO_CODEC, MUX_PRESET, MUX_VIDEO_CODEC, MUX_VIDEO_PROFILE, TranscodeInputs,
    TranscodeMode, TranscodeSpec,
};
