//! Local list and bundled template readers

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::parser::{self, ParseOutcome};
use crate::errors::{SourceError, SourceResult};
use crate::models::SourceKind;

/// Reads one file and parses it, treating absence as an empty source
#[derive(Debug, Clone)]
pub struct FileSourceReader {
    kind: SourceKind,
    path: PathBuf,
}

impl FileSourceReader {
    pub fn local<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            kind: SourceKind::Local,
            path: path.into(),
        }
    }

    pub fn template<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            kind: SourceKind::Template,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file
    ///
    /// A missing file yields an empty outcome. Any other read failure is
    /// logged and also yields an empty outcome.
    pub async fn read(&self) -> ParseOutcome {
        match read_text(&self.path).await {
            Ok(Some(text)) => {
                let outcome = parser::parse(&text);
                outcome.log_diagnostics(&format!("{} source {}", self.kind, self.path.display()));
                info!(
                    "Loaded {} source {}: {} channels, {} urls",
                    self.kind,
                    self.path.display(),
                    outcome.map.channel_count(),
                    outcome.map.url_count()
                );
                outcome
            }
            Ok(None) => {
                info!(
                    "{} source {} does not exist, contributing nothing",
                    self.kind,
                    self.path.display()
                );
                ParseOutcome::default()
            }
            Err(e) => {
                warn!("{} source unavailable: {}", self.kind, e);
                ParseOutcome::default()
            }
        }
    }
}

/// Read a UTF-8 text file, `None` when it does not exist
pub async fn read_text(path: &Path) -> SourceResult<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(Some(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!("{} is not valid UTF-8, decoding lossily", path.display());
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            }))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SourceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
    }
}
