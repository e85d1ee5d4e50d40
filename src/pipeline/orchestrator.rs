//! End-to-end run: read, aggregate, validate, render
//!
//! Stages are separated by barriers. All readers finish before aggregation,
//! and aggregation finishes before any probe is sent.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::aggregator::aggregate;
use super::generator::ResultGenerator;
use super::validator::StreamValidator;
use crate::cache::ProbeCache;
use crate::config::{Config, OutputConfig};
use crate::errors::{AppError, AppResult};
use crate::models::{PipelineStats, SourceMap};
use crate::sources::subscription::read_subscription_list;
use crate::sources::{FileSourceReader, ParseOutcome, SubscriptionFetcher, SubscriptionReport};
use crate::utils::HttpClient;

/// Everything a run produced, ready to be written out
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub map: SourceMap,
    pub document: String,
    pub playlist: Option<String>,
    pub stats: PipelineStats,
}

impl PipelineRun {
    /// Write the result document and, if rendered, the playlist
    ///
    /// Both files are staged before either is renamed into place, so a
    /// failure while staging leaves the previous outputs untouched.
    pub async fn write(&self, output: &OutputConfig) -> AppResult<()> {
        let document = StagedFile::stage(&output.path, &self.document).await?;

        let playlist = match &self.playlist {
            Some(playlist) => match StagedFile::stage(&output.m3u_path, playlist).await {
                Ok(staged) => Some(staged),
                Err(e) => {
                    document.discard().await;
                    return Err(e);
                }
            },
            None => None,
        };

        if let Some(playlist) = playlist {
            if let Err(e) = playlist.commit().await {
                document.discard().await;
                return Err(e);
            }
            info!("Wrote playlist to {}", output.m3u_path.display());
        }

        document.commit().await?;
        info!("Wrote result to {}", output.path.display());
        Ok(())
    }
}

pub struct Pipeline {
    config: Config,
    client: Arc<dyn HttpClient>,
}

impl Pipeline {
    pub fn new(config: Config, client: Arc<dyn HttpClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage once
    ///
    /// Only configuration problems surface as errors. Unreadable sources and
    /// failed probes are absorbed into the result and the counters. When a
    /// cache is supplied it is consulted during validation and updated after.
    pub async fn run(&self, cache: Option<&mut ProbeCache>) -> AppResult<PipelineRun> {
        let started = Instant::now();
        let generator = ResultGenerator::from_config(&self.config.output)?;
        let mut stats = PipelineStats::default();

        let (local, subscriptions, template) = tokio::join!(
            self.read_local(),
            self.read_subscriptions(),
            self.read_template()
        );

        stats.malformed_lines = local.diagnostics.len()
            + template.diagnostics.len()
            + subscriptions.malformed_lines;
        stats.failed_subscriptions = subscriptions.failed;

        let aggregated = aggregate(local.map, subscriptions.map, template.map);
        stats.record_collected(&aggregated);
        info!(
            "Collected {} channels with {} urls",
            stats.channels_collected, stats.urls_collected
        );

        let validator = StreamValidator::new(&self.config.validation, self.client.clone());
        let report = match cache {
            Some(cache) => {
                let report = validator.filter(aggregated, Some(&*cache)).await;
                let now = Utc::now();
                for (url, outcome) in &report.fresh_outcomes {
                    cache.record(url.clone(), outcome.clone(), now);
                }
                report
            }
            None => validator.filter(aggregated, None).await,
        };
        stats.probes_run = report.probes_run;
        stats.probes_cached = report.probes_cached;
        stats.probes_skipped = report.probes_skipped;
        stats.record_retained(&report.map);

        let document = generator.render(&report.map, stats.channels_collected);
        let playlist = self
            .config
            .output
            .m3u_enabled
            .then(|| generator.render_m3u(&report.map));

        stats.elapsed = started.elapsed();
        debug!("Pipeline finished in {:?}", stats.elapsed);

        Ok(PipelineRun {
            map: report.map,
            document,
            playlist,
            stats,
        })
    }

    async fn read_local(&self) -> ParseOutcome {
        if !self.config.sources.local_enabled {
            info!("Local source disabled");
            return ParseOutcome::default();
        }
        FileSourceReader::local(&self.config.sources.local_path)
            .read()
            .await
    }

    async fn read_template(&self) -> ParseOutcome {
        if !self.config.sources.template_enabled {
            info!("Template source disabled");
            return ParseOutcome::default();
        }
        FileSourceReader::template(&self.config.sources.template_path)
            .read()
            .await
    }

    async fn read_subscriptions(&self) -> SubscriptionReport {
        if !self.config.sources.subscription_enabled {
            info!("Subscription source disabled");
            return SubscriptionReport::default();
        }
        let urls = read_subscription_list(&self.config.sources.subscription_list_path).await;
        SubscriptionFetcher::new(self.client.clone(), &self.config.http)
            .fetch_all(&urls)
            .await
    }
}

/// Contents written to a temporary sibling, waiting to replace the target
#[derive(Debug)]
struct StagedFile {
    tmp_path: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    async fn stage(path: &Path, contents: &str) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file_name = path.file_name().ok_or_else(|| {
            AppError::pipeline("output", format!("{} is not a file path", path.display()))
        })?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, contents).await?;
        Ok(Self {
            tmp_path,
            target: path.to_path_buf(),
        })
    }

    async fn commit(self) -> AppResult<()> {
        if let Err(e) = tokio::fs::rename(&self.tmp_path, &self.target).await {
            self.discard().await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.tmp_path).await {
            warn!("Failed to remove {}: {}", self.tmp_path.display(), e);
        }
    }
}

/// Replace `path` with `contents` via a temporary sibling and a rename
pub async fn write_atomic(path: &Path, contents: &str) -> AppResult<()> {
    StagedFile::stage(path, contents).await?.commit().await
}
