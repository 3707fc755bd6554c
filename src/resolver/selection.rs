//! Best-stream selection and bitrate canonicalization

use super::traits::{StreamVariant, VariantCatalog, leading_number};
use crate::error::ResolutionError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Audio bitrate in the `<digits>k` form the transcoder's `-b:a` expects
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalBitrate(String);

impl CanonicalBitrate {
    /// Canonicalize a bitrate label such as `"128kbps"` into `"128k"`
    ///
    /// Uses the first run of digits in the label, so `"129.48kbps"` becomes
    /// `"129k"`. Returns `None` if the label has no digits.
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_batch::resolver::CanonicalBitrate;
    ///
    /// let bitrate = CanonicalBitrate::from_label("160kbps").unwrap();
    /// assert_eq!(bitrate.as_str(), "160k");
    /// assert!(CanonicalBitrate::from_label("best").is_none());
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        leading_number(label).map(|digits| Self(format!("{}k", digits)))
    }

    /// The canonical string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalBitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams chosen for one job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSelection {
    /// Highest-bitrate audio variant
    pub audio: StreamVariant,
    /// Highest-resolution video variant, for muxed jobs
    pub video: Option<StreamVariant>,
    /// Canonical form of the audio bitrate
    pub audio_bitrate: CanonicalBitrate,
}

impl VariantCatalog {
    /// Choose the streams for a job
    ///
    /// Audio is always selected (highest bitrate). Video is selected only when
    /// `audio_only` is false (highest resolution). Ties go to the variant the
    /// resolver listed first. Variants whose quality label has no number are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::NoAudioVariant`] when no audio variant is usable,
    /// [`ResolutionError::NoVideoVariant`] when a muxed job has no usable video.
    pub fn select(&self, source: &Url, audio_only: bool) -> Result<StreamSelection, ResolutionError> {
        let audio = best_ranked(self.audio()).ok_or_else(|| ResolutionError::NoAudioVariant {
            url: source.to_string(),
        })?;
        let audio_bitrate = CanonicalBitrate::from_label(&audio.quality).ok_or_else(|| {
            ResolutionError::NoAudioVariant {
                url: source.to_string(),
            }
        })?;

        let video = if audio_only {
            None
        } else {
            let video = best_ranked(self.video()).ok_or_else(|| ResolutionError::NoVideoVariant {
                url: source.to_string(),
            })?;
            Some(video.clone())
        };

        Ok(StreamSelection {
            audio: audio.clone(),
            video,
            audio_bitrate,
        })
    }
}

/// Highest-ranked variant; the earliest one wins a tie
fn best_ranked<'a>(variants: impl Iterator<Item = &'a StreamVariant>) -> Option<&'a StreamVariant> {
    variants
        .filter_map(|v| v.rank().map(|rank| (rank, v)))
        .fold(None, |best: Option<(u64, &StreamVariant)>, (rank, v)| match best {
            Some((best_rank, _)) if best_rank >= rank => best,
            _ => Some((rank, v)),
        })
        .map(|(_, v)| v)
}
