//! Job list parsing
//!
//! A job list is plain text with one job per line:
//!
//! ```text
//! https://www.youtube.com/watch?v=abc
//! a https://www.youtube.com/watch?v=def
//! ```
//!
//! A bare URL produces a muxed audio/video file, the `a` flag produces an
//! audio-only file. Lines that don't fit either shape become a [`Rejection`].

use serde::{Deserialize, Serialize};
use url::Url;

/// Flag token that marks a job as audio-only
pub const AUDIO_ONLY_FLAG: &str = "a";

/// A validated download job taken from one input line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    line: usize,
    url: Url,
    audio_only: bool,
}

impl JobSpec {
    /// Create a job for an already validated URL
    pub fn new(line: usize, url: Url, audio_only: bool) -> Self {
        Self {
            line,
            url,
            audio_only,
        }
    }

    /// 1-based line number in the job list
    pub fn line(&self) -> usize {
        self.line
    }

    /// Source URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether only the audio stream is wanted
    pub fn audio_only(&self) -> bool {
        self.audio_only
    }
}

/// Why a line could not be turned into a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Empty line or more than two tokens
    MalformedTokenCount,
    /// Two tokens, but not `a <url>`
    InvalidFlag,
    /// A single token that is not a URL
    InvalidUrl,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectionReason::MalformedTokenCount => "expected `<url>` or `a <url>`",
            RejectionReason::InvalidFlag => "unknown flag or invalid URL after flag",
            RejectionReason::InvalidUrl => "not a valid URL",
        };
        f.write_str(reason)
    }
}

/// A line that was skipped
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// 1-based line number in the job list
    pub line: usize,
    /// The line exactly as read (without the line terminator)
    pub raw_line: String,
    /// What was wrong with it
    pub reason: RejectionReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad line {}: {:?} ({})", self.line, self.raw_line, self.reason)
    }
}

/// Parse one line of a job list
///
/// Tokens are separated by any whitespace after trimming the line. Rules:
/// - no tokens, or more than two: [`RejectionReason::MalformedTokenCount`]
/// - two tokens: must be `a <url>`, otherwise [`RejectionReason::InvalidFlag`]
/// - one token: must be a URL, otherwise [`RejectionReason::InvalidUrl`]
///
/// # Examples
///
/// ```
/// use stream_batch::job::{parse_line, RejectionReason};
///
/// let job = parse_line(1, "a https://example.com/video").unwrap();
/// assert!(job.audio_only());
///
/// let rejected = parse_line(2, "b https://example.com/video").unwrap_err();
/// assert_eq!(rejected.reason, RejectionReason::InvalidFlag);
/// ```
pub fn parse_line(line: usize, raw: &str) -> Result<JobSpec, Rejection> {
    let reject = |reason| Rejection {
        line,
        raw_line: raw.to_string(),
        reason,
    };

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Err(reject(RejectionReason::MalformedTokenCount)),
        [single] => parse_url(single)
            .map(|url| JobSpec::new(line, url, false))
            .ok_or_else(|| reject(RejectionReason::InvalidUrl)),
        [flag, candidate] => {
            if *flag != AUDIO_ONLY_FLAG {
                return Err(reject(RejectionReason::InvalidFlag));
            }
            parse_url(candidate)
                .map(|url| JobSpec::new(line, url, true))
                .ok_or_else(|| reject(RejectionReason::InvalidFlag))
        }
        _ => Err(reject(RejectionReason::MalformedTokenCount)),
    }
}

/// Parse every line of a job list, numbering lines from 1
pub fn parse_job_list(content: &str) -> Vec<Result<JobSpec, Rejection>> {
    content
        .lines()
        .enumerate()
        .map(|(idx, raw)| parse_line(idx + 1, raw))
        .collect()
}

/// Accept absolute http(s) URLs that have a host
fn parse_url(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    if matches!(url.scheme(), "http" | "https") && has_host {
        Some(url)
    } else {
        None
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_url_is_a_muxed_job() {
        let job = parse_line(1, "https://example.com/video").unwrap();
        assert_eq!(job.url().as_str(), "https://example.com/video");
        assert!(!job.audio_only());
        assert_eq!(job.line(), 1);
    }

    #[test]
    fn test_flagged_url_is_audio_only() {
        let job = parse_line(4, "a https://example.com/video").unwrap();
        assert!(job.audio_only());
        assert_eq!(job.line(), 4);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let job = parse_line(1, "   a\thttps://example.com/video  \r").unwrap();
        assert!(job.audio_only());
    }

    #[test]
    fn test_empty_and_blank_lines_are_malformed() {
        for raw in ["", "   ", "\t"] {
            let rejection = parse_line(1, raw).unwrap_err();
            assert_eq!(rejection.reason, RejectionReason::MalformedTokenCount);
            assert_eq!(rejection.raw_line, raw);
        }
    }

    #[test]
    fn test_more_than_two_tokens_is_malformed() {
        let rejection = parse_line(1, "a https://example.com/video extra").unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::MalformedTokenCount);
    }

    #[test]
    fn test_wrong_flag_is_invalid_even_with_valid_url() {
        let rejection = parse_line(1, "v https://example.com/video").unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::InvalidFlag);

        let rejection = parse_line(1, "A https://example.com/video").unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::InvalidFlag);
    }

    #[test]
    fn test_flag_with_bad_url_is_invalid_flag() {
        let rejection = parse_line(1, "a not-a-url").unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::InvalidFlag);
    }

    #[test]
    fn test_single_token_must_be_url() {
        for raw in ["example.com/video", "a", "ftp-ish", "mailto:someone@example.com"] {
            let rejection = parse_line(1, raw).unwrap_err();
            assert_eq!(rejection.reason, RejectionReason::InvalidUrl, "{raw}");
        }
    }

    #[test]
    fn test_non_http_schemes_are_rejected() {
        let rejection = parse_line(1, "file:///etc/passwd").unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::InvalidUrl);
    }

    #[test]
    fn test_job_list_numbers_lines_from_one() {
        let parsed = parse_job_list("https://example.com/1\n\na https://example.com/2\n");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].as_ref().unwrap().line(), 1);
        assert_eq!(parsed[1].as_ref().unwrap_err().line, 2);
        assert!(parsed[2].as_ref().unwrap().audio_only());
        assert_eq!(parsed[2].as_ref().unwrap().line(), 3);
    }

    #[test]
    fn test_rejection_display_names_line_and_reason() {
        let rejection = parse_line(7, "x y z").unwrap_err();
        let text = rejection.to_string();
        assert!(text.contains("bad line 7"));
        assert!(text.contains("x y z"));
    }
}
