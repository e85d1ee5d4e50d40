//! Reachability filtering of aggregated channels
//!
//! With validation enabled every channel is deduplicated (optional), capped to
//! its earliest `urls_per_channel` URLs and probed with a bounded number of
//! probes in flight. Probe errors and timeouts are indeterminate and follow
//! `fail_open`; an answered but rejected status always drops the URL.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::cache::ProbeCache;
use crate::config::ValidationConfig;
use crate::errors::SourceError;
use crate::models::{SourceMap, UnreachableReason, ValidationOutcome};
use crate::utils::HttpClient;
use crate::utils::status_code_matcher::is_status_acceptable;
use crate::utils::url::UrlUtils;

/// Filtered map plus what was learned while producing it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub map: SourceMap,
    /// Outcomes decided in this pass, offered to the cache afterwards
    pub fresh_outcomes: Vec<(String, ValidationOutcome)>,
    pub probes_run: usize,
    pub probes_cached: usize,
    /// URLs passed through unprobed because validation is disabled
    pub probes_skipped: usize,
}

pub struct StreamValidator {
    policy: ValidationConfig,
    client: Arc<dyn HttpClient>,
}

impl StreamValidator {
    pub fn new(policy: &ValidationConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            policy: policy.clone(),
            client,
        }
    }

    /// Apply the validation policy to `map`
    ///
    /// `cache` is only read here; callers record `fresh_outcomes` afterwards.
    pub async fn filter(&self, map: SourceMap, cache: Option<&ProbeCache>) -> ValidationReport {
        if !self.policy.enabled {
            return self.pass_through(map);
        }

        let candidates: Vec<(String, Vec<String>)> = map
            .into_iter()
            .map(|(channel, urls)| (channel, self.select_candidates(urls)))
            .collect();

        // Each distinct URL is probed once even when several channels share it
        let mut seen = HashSet::new();
        let unique_urls: Vec<&String> = candidates
            .iter()
            .flat_map(|(_, urls)| urls.iter())
            .filter(|url| seen.insert(url.as_str()))
            .collect();

        let now = Utc::now();
        let mut outcomes: HashMap<String, ValidationOutcome> = HashMap::new();
        let mut to_probe = Vec::new();
        for url in unique_urls {
            match cache.and_then(|c| c.lookup(url, now)) {
                Some(outcome) => {
                    outcomes.insert(url.clone(), outcome.clone());
                }
                None => to_probe.push(url.clone()),
            }
        }
        let probes_cached = outcomes.len();

        info!(
            "Probing {} urls ({} from cache, max {} in flight)",
            to_probe.len(),
            probes_cached,
            self.policy.max_concurrent_probes
        );

        let fresh_outcomes: Vec<(String, ValidationOutcome)> = stream::iter(to_probe)
            .map(|url| async move {
                let outcome = self.probe(&url).await;
                (url, outcome)
            })
            .buffer_unordered(self.policy.max_concurrent_probes.max(1))
            .collect()
            .await;

        for (url, outcome) in &fresh_outcomes {
            outcomes.insert(url.clone(), outcome.clone());
        }

        ValidationReport {
            map: self.retain(candidates, &outcomes),
            probes_run: fresh_outcomes.len(),
            probes_cached,
            probes_skipped: 0,
            fresh_outcomes,
        }
    }

    /// Probe one URL and classify the answer
    pub async fn probe(&self, url: &str) -> ValidationOutcome {
        let timeout = self.policy.probe_timeout;
        let outcome = match tokio::time::timeout(timeout, self.client.probe(url, timeout)).await {
            Err(_) => ValidationOutcome::TimedOut,
            Ok(Ok(response)) => {
                if is_status_acceptable(response.status, &self.policy.accepted_status_codes) {
                    ValidationOutcome::Reachable {
                        status: response.status,
                    }
                } else {
                    ValidationOutcome::Unreachable {
                        reason: UnreachableReason::Status(response.status),
                    }
                }
            }
            Ok(Err(e)) if e.is_timeout() => ValidationOutcome::TimedOut,
            Ok(Err(SourceError::Http { status, .. })) => ValidationOutcome::Unreachable {
                reason: UnreachableReason::Status(status),
            },
            Ok(Err(e)) => ValidationOutcome::Unreachable {
                reason: UnreachableReason::Error(e.to_string()),
            },
        };

        debug!(
            "Probe {} -> {}",
            UrlUtils::obfuscate_credentials(url),
            outcome.label()
        );
        outcome
    }

    fn select_candidates(&self, urls: Vec<String>) -> Vec<String> {
        let urls = if self.policy.deduplicate_urls {
            let mut seen = HashSet::new();
            urls.into_iter()
                .filter(|url| seen.insert(url.clone()))
                .collect()
        } else {
            urls
        };
        urls.into_iter().take(self.policy.urls_per_channel).collect()
    }

    /// Keep URLs whose outcome is retained, then apply the empty-channel policy
    fn retain(
        &self,
        candidates: Vec<(String, Vec<String>)>,
        outcomes: &HashMap<String, ValidationOutcome>,
    ) -> SourceMap {
        let mut filtered = SourceMap::new();
        for (channel, urls) in candidates {
            let survivors: Vec<String> = urls
                .into_iter()
                .filter(|url| {
                    outcomes
                        .get(url)
                        .is_none_or(|o| o.is_retained(self.policy.fail_open))
                })
                .collect();

            if survivors.is_empty() && !self.policy.retain_empty_channels {
                debug!("Dropping channel '{}': no reachable urls", channel);
                continue;
            }
            filtered.insert(channel, survivors);
        }
        filtered
    }

    fn pass_through(&self, map: SourceMap) -> ValidationReport {
        let cap = if self.policy.cap_when_disabled {
            self.policy.urls_per_channel
        } else {
            usize::MAX
        };
        let candidates: Vec<(String, Vec<String>)> = map
            .into_iter()
            .map(|(channel, urls)| (channel, urls.into_iter().take(cap).collect()))
            .collect();

        let outcomes: HashMap<String, ValidationOutcome> = candidates
            .iter()
            .flat_map(|(_, urls)| urls.iter())
            .map(|url| (url.clone(), ValidationOutcome::Skipped))
            .collect();

        info!(
            "Validation disabled, passing through {} channels ({} urls unprobed)",
            candidates.len(),
            outcomes.len()
        );

        ValidationReport {
            map: self.retain(candidates, &outcomes),
            probes_skipped: outcomes.len(),
            fresh_outcomes: outcomes.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceResult;
    use crate::utils::ProbeResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers by host name: `ok` 200, `moved` 302, `gone` 404, `down` refused, `slow` hangs
    #[derive(Default)]
    struct HostClient {
        probed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for HostClient {
        async fn fetch_text(&self, url: &str) -> SourceResult<String> {
            Err(SourceError::InvalidUrl {
                url: url.to_string(),
            })
        }

        async fn probe(&self, url: &str, _timeout: Duration) -> SourceResult<ProbeResponse> {
            self.probed.lock().unwrap().push(url.to_string());
            let host = UrlUtils::extract_domain(url).unwrap_or_default();
            match host.split('.').next().unwrap_or_default() {
                "ok" => Ok(ProbeResponse { status: 200 }),
                "moved" => Ok(ProbeResponse { status: 302 }),
                "gone" => Ok(ProbeResponse { status: 404 }),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(ProbeResponse { status: 200 })
                }
                _ => Err(SourceError::Network {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn policy() -> ValidationConfig {
        ValidationConfig {
            probe_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    fn map(entries: &[(&str, &str)]) -> SourceMap {
        let mut map = SourceMap::new();
        for (channel, url) in entries {
            map.push(*channel, *url);
        }
        map
    }

    #[tokio::test]
    async fn test_probe_classification() {
        let validator = StreamValidator::new(&policy(), Arc::new(HostClient::default()));

        assert_eq!(
            validator.probe("http://ok.example/a").await,
            ValidationOutcome::Reachable { status: 200 }
        );
        assert_eq!(
            validator.probe("http://moved.example/a").await,
            ValidationOutcome::Reachable { status: 302 }
        );
        assert_eq!(
            validator.probe("http://gone.example/a").await,
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Status(404)
            }
        );
        assert!(matches!(
            validator.probe("http://down.example/a").await,
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Error(_)
            }
        ));
        assert_eq!(
            validator.probe("http://slow.example/a").await,
            ValidationOutcome::TimedOut
        );
    }

    #[tokio::test]
    async fn test_fail_open_keeps_indeterminate_urls() {
        let validator = StreamValidator::new(&policy(), Arc::new(HostClient::default()));
        let input = map(&[
            ("X", "http://ok.example/1"),
            ("X", "http://gone.example/2"),
            ("X", "http://down.example/3"),
            ("X", "http://slow.example/4"),
        ]);

        let report = validator.filter(input, None).await;
        assert_eq!(
            report.map.get("X").unwrap(),
            &[
                "http://ok.example/1".to_string(),
                "http://down.example/3".to_string(),
                "http://slow.example/4".to_string(),
            ]
        );
        assert_eq!(report.probes_run, 4);
    }

    #[tokio::test]
    async fn test_fail_closed_drops_indeterminate_urls() {
        let strict = ValidationConfig {
            fail_open: false,
            ..policy()
        };
        let validator = StreamValidator::new(&strict, Arc::new(HostClient::default()));
        let input = map(&[("X", "http://ok.example/1"), ("X", "http://down.example/2")]);

        let report = validator.filter(input, None).await;
        assert_eq!(report.map.get("X").unwrap(), &["http://ok.example/1".to_string()]);
    }

    #[tokio::test]
    async fn test_cap_takes_earliest_urls_only() {
        let capped = ValidationConfig {
            urls_per_channel: 2,
            ..policy()
        };
        let client = Arc::new(HostClient::default());
        let validator = StreamValidator::new(&capped, client.clone());
        let input = map(&[
            ("X", "http://gone.example/1"),
            ("X", "http://ok.example/2"),
            ("X", "http://ok.example/3"),
            ("X", "http://ok.example/4"),
            ("X", "http://ok.example/5"),
        ]);

        let report = validator.filter(input, None).await;
        assert_eq!(report.map.get("X").unwrap(), &["http://ok.example/2".to_string()]);

        let mut probed = client.probed.lock().unwrap().clone();
        probed.sort();
        assert_eq!(probed, vec!["http://gone.example/1", "http://ok.example/2"]);
    }

    #[tokio::test]
    async fn test_dedup_before_cap() {
        let capped = ValidationConfig {
            urls_per_channel: 2,
            ..policy()
        };
        let validator = StreamValidator::new(&capped, Arc::new(HostClient::default()));
        let input = map(&[
            ("X", "http://ok.example/1"),
            ("X", "http://ok.example/1"),
            ("X", "http://ok.example/2"),
        ]);

        let report = validator.filter(input, None).await;
        assert_eq!(
            report.map.get("X").unwrap(),
            &["http://ok.example/1".to_string(), "http://ok.example/2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_channel_retention() {
        let input = map(&[("Dead", "http://gone.example/1"), ("Live", "http://ok.example/1")]);

        let dropping = StreamValidator::new(&policy(), Arc::new(HostClient::default()));
        let report = dropping.filter(input.clone(), None).await;
        assert!(!report.map.contains("Dead"));
        assert!(report.map.contains("Live"));

        let retaining_policy = ValidationConfig {
            retain_empty_channels: true,
            ..policy()
        };
        let retaining = StreamValidator::new(&retaining_policy, Arc::new(HostClient::default()));
        let report = retaining.filter(input, None).await;
        assert_eq!(report.map.get("Dead"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_disabled_is_pass_through() {
        let disabled = ValidationConfig {
            enabled: false,
            urls_per_channel: 1,
            retain_empty_channels: true,
            ..policy()
        };
        let client = Arc::new(HostClient::default());
        let validator = StreamValidator::new(&disabled, client.clone());
        let input = map(&[("X", "http://gone.example/1"), ("X", "http://gone.example/2")]);

        let report = validator.filter(input.clone(), None).await;
        assert_eq!(report.map, input);
        assert_eq!(report.probes_run, 0);
        assert_eq!(report.probes_skipped, 2);
        assert!(
            report
                .fresh_outcomes
                .iter()
                .all(|(_, outcome)| *outcome == ValidationOutcome::Skipped)
        );
        assert!(client.probed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_with_cap_flag() {
        let disabled = ValidationConfig {
            enabled: false,
            urls_per_channel: 1,
            cap_when_disabled: true,
            ..policy()
        };
        let validator = StreamValidator::new(&disabled, Arc::new(HostClient::default()));
        let input = map(&[("X", "http://gone.example/1"), ("X", "http://gone.example/2")]);

        let report = validator.filter(input, None).await;
        assert_eq!(report.map.get("X").unwrap(), &["http://gone.example/1".to_string()]);
    }

    #[tokio::test]
    async fn test_cached_outcomes_skip_probing() {
        let client = Arc::new(HostClient::default());
        let validator = StreamValidator::new(&policy(), client.clone());
        let mut cache = ProbeCache::new(Duration::from_secs(60));
        cache.record(
            "http://ok.example/1".to_string(),
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Status(500),
            },
            Utc::now(),
        );

        let input = map(&[("X", "http://ok.example/1"), ("X", "http://ok.example/2")]);
        let report = validator.filter(input, Some(&cache)).await;

        assert_eq!(report.map.get("X").unwrap(), &["http://ok.example/2".to_string()]);
        assert_eq!(report.probes_cached, 1);
        assert_eq!(report.probes_run, 1);
        assert_eq!(
            client.probed.lock().unwrap().as_slice(),
            &["http://ok.example/2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_shared_url_probed_once() {
        let client = Arc::new(HostClient::default());
        let validator = StreamValidator::new(&policy(), client.clone());
        let input = map(&[("A", "http://ok.example/1"), ("B", "http://ok.example/1")]);

        let report = validator.filter(input, None).await;
        assert_eq!(report.map.channel_count(), 2);
        assert_eq!(client.probed.lock().unwrap().len(), 1);
    }

    /// Tracks how many reachability checks are running at once
    #[derive(Default)]
    struct GaugeClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for GaugeClient {
        async fn fetch_text(&self, url: &str) -> SourceResult<String> {
            Err(SourceError::InvalidUrl {
                url: url.to_string(),
            })
        }

        async fn probe(&self, _url: &str, _timeout: Duration) -> SourceResult<ProbeResponse> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ProbeResponse { status: 200 })
        }
    }

    #[tokio::test]
    async fn test_concurrent_checks_never_exceed_limit() {
        let bounded = ValidationConfig {
            max_concurrent_probes: 3,
            urls_per_channel: 5,
            probe_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let client = Arc::new(GaugeClient::default());
        let validator = StreamValidator::new(&bounded, client.clone());

        let mut input = SourceMap::new();
        for channel in 0..4 {
            for i in 0..5 {
                input.push(format!("C{channel}"), format!("http://h{channel}.example/{i}"));
            }
        }

        let report = validator.filter(input, None).await;
        assert_eq!(report.probes_run, 20);
        assert_eq!(report.map.url_count(), 20);

        let peak = client.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight checks was {peak}");
        assert!(peak >= 2, "checks never overlapped");
    }
}
