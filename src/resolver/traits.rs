//! Traits and types for stream resolution

use crate::error::ResolutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Whether a variant carries only audio or only video
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Audio-only rendition
    Audio,
    /// Video-only rendition
    Video,
}

/// One selectable rendition of a remote media item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Audio or video
    pub kind: StreamKind,
    /// Quality label as reported by the source, e.g. `"128kbps"` or `"1080p"`
    pub quality: String,
    /// Where the stream bytes can be fetched
    pub download_url: Url,
    /// Container extension of the stream, e.g. `"m4a"`, `"webm"`
    pub extension: String,
    /// Request headers the source requires when fetching `download_url`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub http_headers: BTreeMap<String, String>,
}

impl StreamVariant {
    /// Numeric rank of the quality label (bitrate for audio, height for video)
    ///
    /// This is the first run of ASCII digits in the label. Labels without any
    /// digits have no rank and are never selected.
    pub fn rank(&self) -> Option<u64> {
        leading_number(&self.quality).and_then(|digits| digits.parse().ok())
    }
}

/// All variants available for one URL, in the order the resolver listed them
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCatalog {
    /// Title of the media item, used for the output file name
    pub title: String,
    /// Available renditions
    pub variants: Vec<StreamVariant>,
}

impl VariantCatalog {
    /// Audio variants in resolver order
    pub fn audio(&self) -> impl Iterator<Item = &StreamVariant> {
        self.variants.iter().filter(|v| v.kind == StreamKind::Audio)
    }

    /// Video variants in resolver order
    pub fn video(&self) -> impl Iterator<Item = &StreamVariant> {
        self.variants.iter().filter(|v| v.kind == StreamKind::Video)
    }
}

/// First contiguous run of ASCII digits in `label`
pub(crate) fn leading_number(label: &str) -> Option<&str> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let rest = &label[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Trait for looking up the stream catalog of a media URL
///
/// Implementations can shell out to an extractor binary, call an HTTP API, or
/// return canned catalogs in tests. The batch runner only depends on this
/// trait.
///
/// # Examples
///
/// ```no_run
/// use stream_batch::resolver::{StreamResolver, YtDlpResolver};
/// use url::Url;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = YtDlpResolver::from_path().expect("yt-dlp not found in PATH");
/// let url = Url::parse("https://www.youtube.com/watch?v=aqz-KE-bpKQ")?;
/// let catalog = resolver.resolve(&url).await?;
/// println!("{} variants for {}", catalog.variants.len(), catalog.title);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Fetch the variant catalog for `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreachable, the URL is not a
    /// playable media item, or the resolver output cannot be understood.
    async fn resolve(&self, url: &Url) -> Result<VariantCatalog, ResolutionError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn variant(kind: StreamKind, quality: &str) -> StreamVariant {
        StreamVariant {
            kind,
            quality: quality.to_string(),
            download_url: Url::parse("https://cdn.example.com/s").unwrap(),
            extension: "mp4".to_string(),
            http_headers: Default::default(),
        }
    }

    #[test]
    fn test_leading_number_takes_first_digit_run() {
        assert_eq!(leading_number("128kbps"), Some("128"));
        assert_eq!(leading_number("129.48kbps"), Some("129"));
        assert_eq!(leading_number("abr 64k"), Some("64"));
        assert_eq!(leading_number("unknown"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_rank_parses_quality_label() {
        assert_eq!(variant(StreamKind::Video, "1080p").rank(), Some(1080));
        assert_eq!(variant(StreamKind::Audio, "160kbps").rank(), Some(160));
        assert_eq!(variant(StreamKind::Audio, "n/a").rank(), None);
    }

    #[test]
    fn test_catalog_partitions_by_kind_in_order() {
        let catalog = VariantCatalog {
            title: "t".to_string(),
            variants: vec![
                variant(StreamKind::Video, "720p"),
                variant(StreamKind::Audio, "48kbps"),
                variant(StreamKind::Video, "360p"),
                variant(StreamKind::Audio, "128kbps"),
            ],
        };

        let audio: Vec<_> = catalog.audio().map(|v| v.quality.as_str()).collect();
        let video: Vec<_> = catalog.video().map(|v| v.quality.as_str()).collect();
        assert_eq!(audio, ["48kbps", "128kbps"]);
        assert_eq!(video, ["720p", "360p"]);
    }
}
