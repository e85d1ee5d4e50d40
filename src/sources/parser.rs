//! Format-tolerant parser for channel lists
//!
//! Two dialects are understood, chosen once per document:
//!
//! - delimited: `channel,url` per line, split on the first comma
//! - extended playlist: `#EXTINF:...,<channel>` followed by a URL line
//!
//! Parsing never fails. Lines that cannot be used are returned as
//! [`Diagnostic`]s next to the map.

use tracing::warn;

use crate::models::{Diagnostic, DiagnosticKind, SourceMap};
use crate::utils::url::UrlUtils;

const EXTM3U_HEADER: &str = "#EXTM3U";
const EXTINF_DIRECTIVE: &str = "#EXTINF";

const SCHEME_PREFIXES: [&str; 6] = [
    "http://", "https://", "rtmp://", "rtsp://", "udp://", "mms://",
];
const STREAM_SUFFIXES: [&str; 4] = [".m3u8", ".ts", ".mp4", ".flv"];
const PLAYLIST_SUFFIXES: [&str; 2] = [".m3u", ".m3u8"];

/// Input dialect of a whole document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Delimited,
    Extended,
}

impl Dialect {
    /// Sniff the dialect from the content itself
    ///
    /// A document is an extended playlist when its first meaningful line is
    /// the `#EXTM3U` header or when it carries any `#EXTINF` directive.
    pub fn detect(raw: &str) -> Self {
        let mut lines = raw
            .lines()
            .map(|l| l.trim_start_matches('\u{feff}').trim())
            .filter(|l| !l.is_empty());

        match lines.next() {
            Some(first) if first.starts_with(EXTM3U_HEADER) => Dialect::Extended,
            Some(first) if first.starts_with(EXTINF_DIRECTIVE) => Dialect::Extended,
            Some(_) => {
                if lines.any(|l| l.starts_with(EXTINF_DIRECTIVE)) {
                    Dialect::Extended
                } else {
                    Dialect::Delimited
                }
            }
            None => Dialect::Delimited,
        }
    }

    /// Dialect of a subscription document
    ///
    /// `.m3u`/`.m3u8` URL paths (query ignored) select the extended dialect, as
    /// does an explicit `#EXTM3U` header in the body.
    pub fn for_subscription(url: &str, body: &str) -> Self {
        let has_header = body
            .trim_start_matches('\u{feff}')
            .trim_start()
            .starts_with(EXTM3U_HEADER);

        if has_header || UrlUtils::path_ends_with_any(url, &PLAYLIST_SUFFIXES) {
            Dialect::Extended
        } else {
            Dialect::Delimited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Delimited => "delimited",
            Dialect::Extended => "extended",
        }
    }
}

/// Parsed map plus the lines that were skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub map: SourceMap,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    /// Emit one warning per skipped line, tagged with the source label
    pub fn log_diagnostics(&self, source: &str) {
        for diagnostic in &self.diagnostics {
            warn!("Skipped malformed line in {}: {}", source, diagnostic);
        }
    }
}

/// Permissive candidate URL test
///
/// Accepts anything at least 5 characters long that contains a known stream
/// scheme, a known stream file suffix or a bare `://`.
///
/// ```rust
/// use m3u_harvest::sources::is_candidate_url;
///
/// assert!(is_candidate_url("http://a.example/live.m3u8"));
/// assert!(is_candidate_url("cdn.example/ch1.ts"));
/// assert!(!is_candidate_url("not-a-url"));
/// ```
pub fn is_candidate_url(candidate: &str) -> bool {
    if candidate.chars().count() < 5 {
        return false;
    }

    let lower = candidate.to_ascii_lowercase();
    SCHEME_PREFIXES.iter().any(|p| lower.contains(p))
        || STREAM_SUFFIXES.iter().any(|s| lower.contains(s))
        || lower.contains("://")
}

/// Parse with the dialect sniffed from the content
pub fn parse(raw: &str) -> ParseOutcome {
    parse_with(raw, Dialect::detect(raw))
}

pub fn parse_with(raw: &str, dialect: Dialect) -> ParseOutcome {
    match dialect {
        Dialect::Delimited => parse_delimited(raw),
        Dialect::Extended => parse_extended(raw),
    }
}

fn numbered_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_start_matches('\u{feff}').trim()))
}

fn diagnostic(line: usize, kind: DiagnosticKind, content: &str) -> Diagnostic {
    Diagnostic {
        line,
        kind,
        content: content.to_string(),
    }
}

fn parse_delimited(raw: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (line_num, line) in numbered_lines(raw) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((channel, url)) = line.split_once(',') else {
            outcome
                .diagnostics
                .push(diagnostic(line_num, DiagnosticKind::MissingDelimiter, line));
            continue;
        };

        let (channel, url) = (channel.trim(), url.trim());
        let kind = if channel.is_empty() {
            Some(DiagnosticKind::EmptyChannel)
        } else if url.is_empty() {
            Some(DiagnosticKind::EmptyUrl)
        } else if !is_candidate_url(url) {
            Some(DiagnosticKind::RejectedUrl)
        } else {
            None
        };

        match kind {
            Some(kind) => outcome.diagnostics.push(diagnostic(line_num, kind, line)),
            None => outcome.map.push(channel, url),
        }
    }

    outcome
}

fn parse_extended(raw: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    // Channel name waiting for its URL line
    let mut pending: Option<String> = None;

    for (line_num, line) in numbered_lines(raw) {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF_DIRECTIVE) {
            let name = line
                .rfind(',')
                .map(|pos| line[pos + 1..].trim())
                .unwrap_or_default();

            let rejected = if name.is_empty() {
                Some(DiagnosticKind::MissingChannelName)
            } else if name.starts_with('#') {
                Some(DiagnosticKind::CommentChannelName)
            } else {
                None
            };

            pending = match rejected {
                Some(kind) => {
                    outcome.diagnostics.push(diagnostic(line_num, kind, line));
                    None
                }
                None => Some(name.to_string()),
            };
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let Some(channel) = pending.take() else {
            continue;
        };

        if is_candidate_url(line) {
            outcome.map.push(channel, line);
        } else {
            outcome
                .diagnostics
                .push(diagnostic(line_num, DiagnosticKind::RejectedUrl, line));
        }
    }

    outcome
}
