//! Run summary and on-disk file statistics

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::models::PipelineStats;
use crate::utils::human_format::{format_bytes, format_duration};

/// Log the counters of a finished run
pub fn log_summary(stats: &PipelineStats) {
    info!("Run summary:");
    info!("  channels collected: {}", stats.channels_collected);
    info!("  urls collected:     {}", stats.urls_collected);
    info!("  urls retained:      {}", stats.urls_retained);
    info!("  channels retained:  {}", stats.channels_retained);
    info!("  retention rate:     {:.1}%", stats.retention_rate());
    info!(
        "  probes:             {} run, {} from cache, {} skipped",
        stats.probes_run, stats.probes_cached, stats.probes_skipped
    );
    if stats.failed_subscriptions > 0 {
        info!("  failed subscriptions: {}", stats.failed_subscriptions);
    }
    if stats.malformed_lines > 0 {
        info!("  malformed lines:    {}", stats.malformed_lines);
    }
    info!("  elapsed:            {}", format_duration(stats.elapsed));
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub label: &'static str,
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    /// Non-blank, non-comment lines containing a comma
    pub channel_lines: usize,
}

impl FileStats {
    pub fn collect(label: &'static str, path: &Path) -> Self {
        let metadata = std::fs::metadata(path).ok().filter(|m| m.is_file());
        let channel_lines = metadata
            .as_ref()
            .and_then(|_| std::fs::read(path).ok())
            .map(|bytes| count_channel_lines(&String::from_utf8_lossy(&bytes)))
            .unwrap_or(0);

        Self {
            label,
            path: path.to_path_buf(),
            exists: metadata.is_some(),
            size: metadata.map(|m| m.len()).unwrap_or(0),
            channel_lines,
        }
    }
}

pub fn count_channel_lines(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && l.contains(','))
        .count()
}

/// Stats for every file the harvester reads or writes
pub fn collect_file_stats(config_path: &Path, config: &Config) -> Vec<FileStats> {
    vec![
        FileStats::collect("config", config_path),
        FileStats::collect("local", &config.sources.local_path),
        FileStats::collect("subscriptions", &config.sources.subscription_list_path),
        FileStats::collect("template", &config.sources.template_path),
        FileStats::collect("result", &config.output.path),
        FileStats::collect("playlist", &config.output.m3u_path),
        FileStats::collect("cache", &config.cache.path),
    ]
}

pub fn format_file_stats(stats: &[FileStats]) -> String {
    let mut out = String::from("File statistics:\n");
    for s in stats {
        if s.exists {
            out.push_str(&format!(
                "  {:<14} {} ({}, {} channel lines)\n",
                s.label,
                s.path.display(),
                format_bytes(s.size),
                s.channel_lines
            ));
        } else {
            out.push_str(&format!("  {:<14} {} (missing)\n", s.label, s.path.display()));
        }
    }
    out
}
