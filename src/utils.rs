//! Utility functions for file naming, timing and temp-file handling

use crate::types::{LocalMediaFile, MediaKind};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timestamp format used in output and temporary file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Format a capture time the way it appears in file names
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use stream_batch::utils::format_timestamp;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
/// assert_eq!(format_timestamp(&at), "2024-03-09_07-05-01");
/// ```
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Make a media title safe to use as a file name stem
///
/// Spaces and path separators become underscores.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Name of a final output file: `<sanitizedTitle>_<timestamp>.<ext>`
pub fn output_file_name(title: &str, timestamp: &str, extension: &str) -> String {
    format!("{}_{}.{}", sanitize_title(title), timestamp, extension)
}

/// Final output path in `dir` that does not replace an existing file
///
/// Starts from [`output_file_name`]. When that name is taken (two jobs with
/// the same title in the same second) the job line is appended to the stem,
/// then a counter.
pub async fn unique_output_path(
    dir: &Path,
    title: &str,
    timestamp: &str,
    job_line: usize,
    extension: &str,
) -> std::io::Result<PathBuf> {
    let preferred = dir.join(output_file_name(title, timestamp, extension));
    if !tokio::fs::try_exists(&preferred).await? {
        return Ok(preferred);
    }

    let stem = format!("{}_{}_{}", sanitize_title(title), timestamp, job_line);
    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut counter: u32 = 1;
    while tokio::fs::try_exists(&candidate).await? {
        candidate = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    debug!(path = ?candidate, "output name taken, using disambiguated name");
    Ok(candidate)
}

/// Path of a temporary stream file for one job
///
/// The timestamp, process id and job line number keep names unique across
/// sequential jobs and across processes sharing a temp directory.
pub fn temp_file_path(
    temp_dir: &Path,
    kind: MediaKind,
    timestamp: &str,
    job_line: usize,
    extension: &str,
) -> PathBuf {
    temp_dir.join(format!(
        "{}_{}_{}_{}.{}",
        kind,
        timestamp,
        std::process::id(),
        job_line,
        extension
    ))
}

/// Remove temporary files, logging failures instead of returning them
///
/// Files that are already gone are ignored. Returns the number of files removed.
pub async fn remove_temp_files(files: &[LocalMediaFile]) -> usize {
    let mut removed = 0;
    for file in files.iter().filter(|f| f.kind.is_temporary()) {
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => {
                debug!(path = ?file.path, kind = %file.kind, "removed temporary file");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = ?file.path, error = %e, "failed to remove temporary file");
            }
        }
    }
    removed
}

/// Measures how long a labelled piece of work takes
///
/// ```
/// use stream_batch::utils::ScopedTimer;
///
/// let timer = ScopedTimer::start("job 1");
/// // ... work ...
/// let elapsed = timer.finish();
/// assert!(elapsed.as_secs() < 60);
/// ```
#[derive(Debug)]
pub struct ScopedTimer {
    label: String,
    started: Instant,
}

impl ScopedTimer {
    /// Start timing
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop timing, log the duration and return it
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            label = %self.label,
            elapsed_secs = elapsed.as_secs_f64(),
            "process time"
        );
        elapsed
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_replaces_spaces_and_separators() {
        assert_eq!(sanitize_title("My Song / Live"), "My_Song___Live");
        assert_eq!(sanitize_title(r"a\b"), "a_b");
        assert_eq!(sanitize_title("plain"), "plain");
    }

    #[test]
    fn test_output_name_matches_pattern() {
        let at = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        let name = output_file_name("Big Buck Bunny", &format_timestamp(&at), "mkv");
        assert_eq!(name, "Big_Buck_Bunny_2023-12-31_23-59-58.mkv");
    }

    #[test]
    fn test_temp_paths_differ_per_job_and_kind() {
        let dir = Path::new("/tmp/work");
        let ts = "2024-01-01_00-00-00";
        let audio_1 = temp_file_path(dir, MediaKind::Audio, ts, 1, "m4a");
        let audio_2 = temp_file_path(dir, MediaKind::Audio, ts, 2, "m4a");
        let video_1 = temp_file_path(dir, MediaKind::Video, ts, 1, "mp4");

        assert_ne!(audio_1, audio_2);
        assert_ne!(audio_1, video_1);
        assert!(audio_1.starts_with(dir));
        let name = audio_1.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("audio_2024-01-01_00-00-00_"));
        assert!(name.ends_with("_1.m4a"));
    }

    #[tokio::test]
    async fn test_remove_temp_files_skips_final_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.m4a");
        let output = dir.path().join("out.mp3");
        std::fs::write(&audio, b"a").unwrap();
        std::fs::write(&output, b"o").unwrap();

        let removed = remove_temp_files(&[
            LocalMediaFile::new(&audio, MediaKind::Audio),
            LocalMediaFile::new(dir.path().join("gone.mp4"), MediaKind::Video),
            LocalMediaFile::new(&output, MediaKind::Final),
        ])
        .await;

        assert_eq!(removed, 1);
        assert!(!audio.exists());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_unique_output_path_never_reuses_an_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let ts = "2024-01-01_00-00-00";

        let first = unique_output_path(dir.path(), "Song", ts, 1, "mp3").await.unwrap();
        assert_eq!(first, dir.path().join("Song_2024-01-01_00-00-00.mp3"));
        std::fs::write(&first, b"one").unwrap();

        let second = unique_output_path(dir.path(), "Song", ts, 2, "mp3").await.unwrap();
        assert_eq!(second, dir.path().join("Song_2024-01-01_00-00-00_2.mp3"));
        std::fs::write(&second, b"two").unwrap();

        let third = unique_output_path(dir.path(), "Song", ts, 2, "mp3").await.unwrap();
        assert_eq!(third, dir.path().join("Song_2024-01-01_00-00-00_2_1.mp3"));
    }

    #[test]
    fn test_timer_reports_elapsed_time() {
        let timer = ScopedTimer::start("test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.finish() >= Duration::from_millis(5));
    }
}
