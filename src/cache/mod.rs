//! Optional memo of probe outcomes between runs
//!
//! Stored as gzip-compressed JSON. The cache is an accelerator only: a missing
//! or unreadable file starts an empty cache, and nothing in the pipeline needs
//! it to produce a correct result.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::ValidationOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub outcome: ValidationOutcome,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone)]
pub struct ProbeCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ProbeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Load from `path`, starting empty when the file is missing or corrupt
    pub async fn load(path: &Path, ttl: Duration) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No probe cache at {}", path.display());
                return Self::new(ttl);
            }
            Err(e) => {
                warn!("Could not read probe cache {}: {}", path.display(), e);
                return Self::new(ttl);
            }
        };

        match Self::decode(&bytes) {
            Ok(file) => {
                info!(
                    "Loaded {} cached probe outcomes from {}",
                    file.entries.len(),
                    path.display()
                );
                Self {
                    entries: file.entries,
                    ttl,
                }
            }
            Err(e) => {
                warn!("Ignoring corrupt probe cache {}: {}", path.display(), e);
                Self::new(ttl)
            }
        }
    }

    /// Persist fresh entries, replacing the file atomically
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        let now = Utc::now();
        let file = CacheFile {
            entries: self
                .entries
                .iter()
                .filter(|(_, entry)| self.is_fresh(entry, now))
                .map(|(url, entry)| (url.clone(), entry.clone()))
                .collect(),
        };
        let bytes = Self::encode(&file)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        debug!(
            "Saved {} probe outcomes to {}",
            file.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Cached outcome for `url` if it was recorded within the TTL
    pub fn lookup(&self, url: &str, now: DateTime<Utc>) -> Option<&ValidationOutcome> {
        self.entries
            .get(url)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.outcome)
    }

    /// Remember an outcome; `Skipped` carries no information and is ignored
    pub fn record(&mut self, url: String, outcome: ValidationOutcome, now: DateTime<Utc>) {
        if outcome == ValidationOutcome::Skipped {
            return;
        }
        self.entries.insert(
            url,
            CacheEntry {
                outcome,
                checked_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.checked_at).to_std() {
            Ok(age) => age <= self.ttl,
            // Recorded in the future (clock skew): treat as fresh
            Err(_) => true,
        }
    }

    fn encode(file: &CacheFile) -> AppResult<Vec<u8>> {
        let json = serde_json::to_vec(file)
            .map_err(|e| AppError::pipeline("cache", format!("serialize: {e}")))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    fn decode(bytes: &[u8]) -> anyhow::Result<CacheFile> {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
