//! Stream resolution
//!
//! Turns a media URL into a [`VariantCatalog`] of audio-only and video-only
//! renditions, and picks the best of each for a job.
//!
//! ## Architecture
//!
//! The core abstraction is the [`StreamResolver`] trait. The batch runner holds
//! an `Arc<dyn StreamResolver>`, so any backend can be plugged in:
//!
//! - [`YtDlpResolver`]: runs an external `yt-dlp` binary and parses `-J` output
//!
//! Selection is independent of the backend: [`VariantCatalog::select`] applies
//! the highest-bitrate / highest-resolution rule and produces the
//! [`CanonicalBitrate`] passed to the transcoder.
//!
//! ## Usage
//!
//! ```no_run
//! use stream_batch::resolver::{StreamResolver, YtDlpResolver};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = YtDlpResolver::from_path().expect("yt-dlp not found");
//!     let url = Url::parse("https://www.youtube.com/watch?v=aqz-KE-bpKQ")?;
//!
//!     let catalog = resolver.resolve(&url).await?;
//!     let selection = catalog.select(&url, false)?;
//!     println!("audio at {}", selection.audio_bitrate);
//!     Ok(())
//! }
//! ```

mod parser;
mod selection;
mod traits;
mod ytdlp;

pub use parser::parse_info_json;
pub use selection::{CanonicalBitrate, StreamSelection};
pub use traits::{StreamKind, StreamResolver, StreamVariant, VariantCatalog};
pub use ytdlp::YtDlpResolver;
