use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::SourceMap;

/// Counters handed to whoever reports on a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub channels_collected: usize,
    pub urls_collected: usize,
    pub urls_retained: usize,
    pub channels_retained: usize,
    /// Subscriptions that contributed nothing because they failed
    pub failed_subscriptions: usize,
    /// Lines dropped by the parser across all sources
    pub malformed_lines: usize,
    pub probes_run: usize,
    pub probes_cached: usize,
    /// URLs passed through without a check while validation is disabled
    pub probes_skipped: usize,
    #[serde(with = "crate::config::duration_serde::duration")]
    pub elapsed: Duration,
}

impl PipelineStats {
    pub fn record_collected(&mut self, map: &SourceMap) {
        self.channels_collected = map.channel_count();
        self.urls_collected = map.url_count();
    }

    pub fn record_retained(&mut self, map: &SourceMap) {
        self.channels_retained = map.channel_count();
        self.urls_retained = map.url_count();
    }

    /// Percentage of collected URLs that survived filtering
    pub fn retention_rate(&self) -> f64 {
        if self.urls_collected == 0 {
            0.0
        } else {
            self.urls_retained as f64 / self.urls_collected as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_rate() {
        let stats = PipelineStats {
            urls_collected: 8,
            urls_retained: 2,
            ..Default::default()
        };
        assert_eq!(stats.retention_rate(), 25.0);
        assert_eq!(PipelineStats::default().retention_rate(), 0.0);
    }

    #[test]
    fn test_record_counts_from_maps() {
        let mut map = SourceMap::new();
        map.push("A", "http://a/1");
        map.push("A", "http://a/2");
        map.push("B", "http://b/1");

        let mut stats = PipelineStats::default();
        stats.record_collected(&map);
        stats.record_retained(&map);
        assert_eq!(stats.channels_collected, 2);
        assert_eq!(stats.urls_collected, 3);
        assert_eq!(stats.channels_retained, 2);
        assert_eq!(stats.urls_retained, 3);
    }
}
