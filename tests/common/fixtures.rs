//! Fake external tools and mocked stream servers

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stream_batch::resolver::StreamKind;
use stream_batch::{ResolutionError, StreamResolver, StreamVariant, VariantCatalog};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Message returned for URLs the fake resolver does not know
pub const UNAVAILABLE: &str = "ERROR: Video unavailable";

/// Resolver answering from a fixed URL → catalog table
#[derive(Default)]
pub struct FakeResolver {
    catalogs: HashMap<String, VariantCatalog>,
}

impl FakeResolver {
    /// Register the catalog for `url`
    pub fn with_catalog(mut self, url: &str, catalog: VariantCatalog) -> Self {
        self.catalogs.insert(url.to_string(), catalog);
        self
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, url: &Url) -> Result<VariantCatalog, ResolutionError> {
        self.catalogs
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ResolutionError::ResolverFailed {
                url: url.to_string(),
                message: UNAVAILABLE.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Audio variant served by `server` at `route`
pub fn audio_variant(server: &MockServer, route: &str, quality: &str) -> StreamVariant {
    StreamVariant {
        kind: StreamKind::Audio,
        quality: quality.to_string(),
        download_url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
        extension: "m4a".to_string(),
        http_headers: Default::default(),
    }
}

/// Video variant served by `server` at `route`
pub fn video_variant(server: &MockServer, route: &str, quality: &str) -> StreamVariant {
    StreamVariant {
        kind: StreamKind::Video,
        quality: quality.to_string(),
        download_url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
        extension: "mp4".to_string(),
        http_headers: Default::default(),
    }
}

/// Serve `body` at `route`
pub async fn mount_stream(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Serve `body` at `route` after `delay`
pub async fn mount_slow_stream(server: &MockServer, route: &str, body: &[u8], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Shell script standing in for ffmpeg
///
/// Records its arguments in `<dir>/args.txt`, prints on both output streams,
/// writes the last argument as the output file and exits with `exit_code`.
#[cfg(unix)]
pub fn fake_transcoder(dir: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    let script = format!(
        r#"#!/bin/sh
for arg in "$@"; do printf '%s\n' "$arg"; done > "{args}"
echo "ffmpeg version test"
printf 'size=   1kB time=00:00:01\r' >&2
for last in "$@"; do :; done
echo converted > "$last"
exit {code}
"#,
        args = dir.join("args.txt").display(),
        code = exit_code
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Transcoder that hangs long enough to be interrupted
#[cfg(unix)]
pub fn hanging_transcoder(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("hanging-ffmpeg");
    std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments recorded by the last [`fake_transcoder`] run
pub fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
