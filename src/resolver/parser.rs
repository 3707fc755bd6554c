//! Parser for `yt-dlp -J` output

use super::traits::{StreamKind, StreamVariant, VariantCatalog};
use crate::error::ResolutionError;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

/// Subset of the yt-dlp info document that the catalog needs
#[derive(Debug, Deserialize)]
struct InfoDocument {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    url: Option<String>,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    tbr: Option<f64>,
    height: Option<u64>,
    protocol: Option<String>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
}

impl FormatEntry {
    fn kind(&self) -> Option<StreamKind> {
        let has_audio = codec_present(self.acodec.as_deref());
        let has_video = codec_present(self.vcodec.as_deref());
        match (has_audio, has_video) {
            (true, false) => Some(StreamKind::Audio),
            (false, true) => Some(StreamKind::Video),
            _ => None,
        }
    }

    fn is_direct_download(&self) -> bool {
        matches!(self.protocol.as_deref(), Some("http") | Some("https"))
    }

    /// Audio bitrate, falling back to the total bitrate for audio-only entries
    fn audio_bitrate(&self) -> Option<f64> {
        self.abr
            .filter(|abr| *abr > 0.0)
            .or(self.tbr)
            .filter(|rate| *rate > 0.0)
    }

    fn into_variant(self) -> Option<StreamVariant> {
        if !self.is_direct_download() {
            return None;
        }
        let kind = self.kind()?;
        let quality = match kind {
            StreamKind::Audio => format!("{}kbps", self.audio_bitrate()?),
            StreamKind::Video => format!("{}p", self.height?),
        };
        let download_url = Url::parse(self.url.as_deref()?).ok()?;
        Some(StreamVariant {
            kind,
            quality,
            download_url,
            extension: self.ext.unwrap_or_else(|| "bin".to_string()),
            http_headers: self.http_headers,
        })
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

/// Build a catalog from the JSON printed by `yt-dlp -J`
///
/// Only single-kind formats (audio-only or video-only) that can be fetched
/// with a plain HTTP GET are kept, in the order yt-dlp listed them.
pub fn parse_info_json(url: &Url, json: &[u8]) -> Result<VariantCatalog, ResolutionError> {
    let document: InfoDocument =
        serde_json::from_slice(json).map_err(|e| ResolutionError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let title = document
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ResolutionError::InvalidResponse {
            url: url.to_string(),
            reason: "missing title".to_string(),
        })?;

    let variants = document
        .formats
        .into_iter()
        .filter_map(FormatEntry::into_variant)
        .collect();

    Ok(VariantCatalog { title, variants })
}
