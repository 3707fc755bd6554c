//! Configuration types for stream-batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// External tool paths
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the transcoder executable (ffmpeg compatible). Must be supplied.
    #[serde(default)]
    pub transcoder_path: PathBuf,

    /// Path to the yt-dlp compatible resolver (auto-detected if None)
    #[serde(default)]
    pub resolver_path: Option<PathBuf>,

    /// Whether to search PATH for the resolver if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            transcoder_path: PathBuf::new(),
            resolver_path: None,
            search_path: true,
        }
    }
}

/// Where files go and how they are fetched
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory for final output files (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for temporary stream files (default: ".")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Leave temporary files of failed jobs on disk for inspection (default: false)
    #[serde(default)]
    pub keep_temp_on_failure: bool,

    /// User-Agent header sent with stream downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            keep_temp_on_failure: false,
            user_agent: default_user_agent(),
        }
    }
}

/// Optional time limits per pipeline stage
///
/// None means wait indefinitely. A timeout fails the job it belongs to,
/// never the batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Limit for resolving one URL (seconds)
    #[serde(default, with = "optional_duration_serde")]
    pub resolve_timeout: Option<Duration>,

    /// Limit for downloading one stream (seconds)
    #[serde(default, with = "optional_duration_serde")]
    pub download_timeout: Option<Duration>,

    /// Limit for one transcoder run (seconds)
    #[serde(default, with = "optional_duration_serde")]
    pub transcode_timeout: Option<Duration>,

    /// Limit for a whole job, resolve through transcode (seconds)
    #[serde(default, with = "optional_duration_serde")]
    pub job_timeout: Option<Duration>,
}

/// Main configuration for the batch runner
///
/// The sub-configs are flattened so a config file is a single flat JSON object:
///
/// ```json
/// {
///   "transcoder_path": "/usr/bin/ffmpeg",
///   "output_dir": "media",
///   "download_timeout": 600
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Output and download settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Stage time limits
    #[serde(flatten)]
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.tools.transcoder_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "transcoder path must be set".to_string(),
                key: Some("transcoder_path".to_string()),
            });
        }
        if self.download.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user agent must not be empty".to_string(),
                key: Some("user_agent".to_string()),
            });
        }
        Ok(())
    }

    /// Final output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Temporary stream directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_user_agent() -> String {
    format!("stream-batch/{}", env!("CARGO_PKG_VERSION"))
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
