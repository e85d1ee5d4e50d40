//! Core data types shared by every pipeline stage

pub mod outcome;
pub mod source_map;
pub mod stats;

pub use outcome::*;
pub use source_map::*;
pub use stats::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which producer a source map came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Subscription,
    Template,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Subscription => "subscription",
            SourceKind::Template => "template",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line was skipped while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Delimited line without a comma
    MissingDelimiter,
    /// Channel name empty after trimming
    EmptyChannel,
    /// URL empty after trimming
    EmptyUrl,
    /// URL failed the candidate acceptance test
    RejectedUrl,
    /// Playlist directive without a channel name
    MissingChannelName,
    /// Channel name that would read back as a comment line
    CommentChannelName,
}

/// A skipped input line, recorded instead of failing the parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line number within the source text
    pub line: usize,
    pub kind: DiagnosticKind,
    pub content: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            DiagnosticKind::MissingDelimiter => "missing comma delimiter",
            DiagnosticKind::EmptyChannel => "empty channel name",
            DiagnosticKind::EmptyUrl => "empty url",
            DiagnosticKind::RejectedUrl => "not a candidate url",
            DiagnosticKind::MissingChannelName => "directive without channel name",
            DiagnosticKind::CommentChannelName => "channel name starts with '#'",
        };
        write!(f, "line {}: {} ({})", self.line, reason, self.content)
    }
}
