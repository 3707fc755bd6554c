//! Resolver backed by an external yt-dlp binary

use super::parser::parse_info_json;
use super::traits::{StreamResolver, VariantCatalog};
use crate::config::Config;
use crate::error::{Error, ResolutionError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Resolver that runs `yt-dlp -J --no-playlist <url>` and parses its JSON
///
/// # Examples
///
/// ```no_run
/// use stream_batch::resolver::YtDlpResolver;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let resolver = YtDlpResolver::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let resolver = YtDlpResolver::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpResolver {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl YtDlpResolver {
    /// Create a resolver with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` if the binary is not installed.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Limit how long a single lookup may take
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the binary this resolver runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    /// Build from configuration
    ///
    /// An explicit `resolver_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled. The resolve timeout is applied either way.
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let resolver = match (&config.tools.resolver_path, config.tools.search_path) {
            (Some(path), _) => Self::new(path.clone()),
            (None, true) => Self::from_path().ok_or_else(|| Error::Config {
                message: "yt-dlp not found in PATH".to_string(),
                key: Some("resolver_path".to_string()),
            })?,
            (None, false) => {
                return Err(Error::Config {
                    message: "resolver path must be set when PATH search is disabled"
                        .to_string(),
                    key: Some("resolver_path".to_string()),
                });
            }
        };
        Ok(resolver.with_timeout(config.timeouts.resolve_timeout))
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    async fn resolve(&self, url: &Url) -> Result<VariantCatalog, ResolutionError> {
        debug!(binary = ?self.binary_path, %url, "resolving stream catalog");

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-J")
            .arg("--no-playlist")
            .arg(url.as_str())
            .kill_on_drop(true);

        let run = command.output();
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, run).await.map_err(|_| {
                ResolutionError::TimedOut {
                    url: url.to_string(),
                    timeout,
                }
            })?,
            None => run.await,
        }
        .map_err(|e| ResolutionError::Spawn {
            binary: self.binary_path.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolutionError::ResolverFailed {
                url: url.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        let catalog = parse_info_json(url, &output.stdout)?;
        debug!(%url, title = %catalog.title, variants = catalog.variants.len(), "resolved");
        Ok(catalog)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://example.com/watch?v=1").unwrap()
    }

    #[test]
    fn test_from_path_consistency_with_which_crate() {
        let which_result = which::which("yt-dlp");
        let from_path_result = YtDlpResolver::from_path();

        assert_eq!(
            which_result.is_ok(),
            from_path_result.is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
    }

    #[tokio::test]
    async fn test_invalid_binary_path_is_spawn_error() {
        let resolver = YtDlpResolver::new(PathBuf::from("/nonexistent/path/to/yt-dlp"));

        let err = resolver.resolve(&source()).await.unwrap_err();
        match err {
            ResolutionError::Spawn { binary, .. } => {
                assert_eq!(binary, PathBuf::from("/nonexistent/path/to/yt-dlp"))
            }
            other => panic!("Expected Spawn error, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_config_prefers_explicit_path() {
        let mut config = Config::default();
        config.tools.resolver_path = Some(PathBuf::from("/opt/yt-dlp"));
        config.tools.search_path = false;
        config.timeouts.resolve_timeout = Some(Duration::from_secs(30));

        let resolver = YtDlpResolver::from_config(&config).unwrap();
        assert_eq!(resolver.binary_path(), &PathBuf::from("/opt/yt-dlp"));
        assert_eq!(resolver.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_config_without_path_or_search_is_config_error() {
        let mut config = Config::default();
        config.tools.search_path = false;

        match YtDlpResolver::from_config(&config) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("resolver_path")),
            Err(other) => panic!("Expected Config error, got: {:?}", other),
            Ok(_) => panic!("Expected Config error"),
        }
    }

    #[cfg(unix)]
    fn fake_resolver(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_parses_stdout_of_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"title":"Clip","formats":[{"url":"https://cdn.example.com/a","ext":"m4a","acodec":"opus","vcodec":"none","abr":160,"protocol":"https"}]}"#;
        let binary = fake_resolver(dir.path(), &format!("echo '{}'", json));

        let catalog = YtDlpResolver::new(binary).resolve(&source()).await.unwrap();
        assert_eq!(catalog.title, "Clip");
        assert_eq!(catalog.variants.len(), 1);
        assert_eq!(catalog.variants[0].quality, "160kbps");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_resolver(dir.path(), "echo 'ERROR: Video unavailable' >&2; exit 1");

        let err = YtDlpResolver::new(binary).resolve(&source()).await.unwrap_err();
        match err {
            ResolutionError::ResolverFailed { message, .. } => {
                assert_eq!(message, "ERROR: Video unavailable")
            }
            other => panic!("Expected ResolverFailed, got: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_resolver_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_resolver(dir.path(), "sleep 5");

        let err = YtDlpResolver::new(binary)
            .with_timeout(Some(Duration::from_millis(100)))
            .resolve(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::TimedOut { .. }));
    }

    #[tokio::test]
    #[ignore] // Requires yt-dlp in PATH and network access
    async fn test_integration_test_resolve_real_video() {
        let resolver = match YtDlpResolver::from_path() {
            Some(r) => r,
            None => {
                println!("Skipping test: yt-dlp binary not found in PATH");
                return;
            }
        };

        let url = Url::parse("https://www.youtube.com/watch?v=aqz-KE-bpKQ").unwrap();
        let catalog = resolver.resolve(&url).await.unwrap();
        assert!(catalog.audio().count() > 0);
    }
}
