//! Remote subscription fetching
//!
//! Each subscription URL is fetched with its own timeout, at most
//! `max_concurrent_fetches` at a time. Results are reassembled in list order
//! before merging, so completion order never reaches the output.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::file::read_text;
use super::parser::{self, Dialect, ParseOutcome};
use crate::config::HttpConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::SourceMap;
use crate::utils::HttpClient;
use crate::utils::url::UrlUtils;

/// Merged contribution of all subscriptions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionReport {
    pub map: SourceMap,
    pub attempted: usize,
    pub failed: usize,
    pub malformed_lines: usize,
}

/// Extract subscription URLs from the list file contents
///
/// Blank lines and `#` comments are skipped; malformed URLs are logged and
/// skipped.
pub fn parse_subscription_list(raw: &str) -> Vec<String> {
    raw.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            if UrlUtils::is_well_formed(line) {
                Some(line.to_string())
            } else {
                warn!(
                    "Ignoring malformed subscription URL on line {}: {}",
                    idx + 1,
                    UrlUtils::obfuscate_credentials(line)
                );
                None
            }
        })
        .collect()
}

/// Read the subscription list file; a missing file means no subscriptions
pub async fn read_subscription_list(path: &Path) -> Vec<String> {
    match read_text(path).await {
        Ok(Some(text)) => parse_subscription_list(&text),
        Ok(None) => {
            info!("Subscription list {} does not exist", path.display());
            Vec::new()
        }
        Err(e) => {
            warn!("Subscription list unavailable: {}", e);
            Vec::new()
        }
    }
}

pub struct SubscriptionFetcher {
    client: Arc<dyn HttpClient>,
    request_timeout: Duration,
    max_concurrent: usize,
}

impl SubscriptionFetcher {
    pub fn new(client: Arc<dyn HttpClient>, config: &HttpConfig) -> Self {
        Self {
            client,
            request_timeout: config.request_timeout,
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    /// Fetch every subscription and merge them in list order
    pub async fn fetch_all(&self, urls: &[String]) -> SubscriptionReport {
        let mut report = SubscriptionReport {
            attempted: urls.len(),
            ..Default::default()
        };

        if urls.is_empty() {
            return report;
        }

        info!(
            "Fetching {} subscriptions (max {} in flight)",
            urls.len(),
            self.max_concurrent
        );

        // `buffered` yields in input order whatever order the fetches finish in
        let results: Vec<(&String, SourceResult<ParseOutcome>)> = stream::iter(urls)
            .map(|url| async move { (url, self.fetch_one(url).await) })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        for (url, result) in results {
            let safe_url = UrlUtils::obfuscate_credentials(url);
            match result {
                Ok(outcome) => {
                    outcome.log_diagnostics(&format!("subscription {safe_url}"));
                    info!(
                        "Subscription {} contributed {} channels, {} urls",
                        safe_url,
                        outcome.map.channel_count(),
                        outcome.map.url_count()
                    );
                    report.malformed_lines += outcome.diagnostics.len();
                    report.map.append(outcome.map);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Subscription {} failed: {}", safe_url, e);
                }
            }
        }

        if report.failed > 0 {
            warn!(
                "{} of {} subscriptions failed and contributed nothing",
                report.failed, report.attempted
            );
        }

        report
    }

    async fn fetch_one(&self, url: &str) -> SourceResult<ParseOutcome> {
        debug!("Fetching subscription {}", UrlUtils::obfuscate_credentials(url));

        let body = tokio::time::timeout(self.request_timeout, self.client.fetch_text(url))
            .await
            .map_err(|_| SourceError::Timeout {
                url: UrlUtils::obfuscate_credentials(url),
            })??;

        let dialect = Dialect::for_subscription(url, &body);
        debug!("Parsing subscription as {} dialect", dialect.as_str());
        Ok(parser::parse_with(&body, dialect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::utils::ProbeResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticClient;

    #[async_trait]
    impl HttpClient for StaticClient {
        async fn fetch_text(&self, url: &str) -> SourceResult<String> {
            match url {
                "http://a.example/list.txt" => Ok("CNN,http://a.example/cnn\n".to_string()),
                "http://b.example/list.m3u" => {
                    Ok("#EXTINF:-1,CNN\nhttp://b.example/cnn\n".to_string())
                }
                _ => Err(SourceError::Http {
                    status: 404,
                    url: url.to_string(),
                }),
            }
        }

        async fn probe(&self, _url: &str, _timeout: Duration) -> SourceResult<ProbeResponse> {
            Ok(ProbeResponse { status: 200 })
        }
    }

    #[test]
    fn test_parse_subscription_list() {
        let raw = "# lists\nhttp://a.example/list.txt\n\nnot a url\n  https://b.example/x.m3u  \n";
        assert_eq!(
            parse_subscription_list(raw),
            vec![
                "http://a.example/list.txt".to_string(),
                "https://b.example/x.m3u".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_list_means_no_subscriptions() {
        let urls = tokio_test::block_on(read_subscription_list(Path::new(
            "/nonexistent/m3u-harvest/subscribe.txt",
        )));
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_merges_in_list_order() {
        let fetcher = SubscriptionFetcher::new(Arc::new(StaticClient), &HttpConfig::default());
        let urls = vec![
            "http://b.example/list.m3u".to_string(),
            "http://missing.example/x".to_string(),
            "http://a.example/list.txt".to_string(),
        ];

        let report = fetcher.fetch_all(&urls).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.map.get("CNN").unwrap(),
            &[
                "http://b.example/cnn".to_string(),
                "http://a.example/cnn".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_list_fetches_nothing() {
        let fetcher = SubscriptionFetcher::new(Arc::new(StaticClient), &HttpConfig::default());
        let report = fetcher.fetch_all(&[]).await;
        assert_eq!(report, SubscriptionReport::default());
    }

    #[derive(Default)]
    struct GaugeClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for GaugeClient {
        async fn fetch_text(&self, url: &str) -> SourceResult<String> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("Chan,{url}/live.m3u8\n"))
        }

        async fn probe(&self, _url: &str, _timeout: Duration) -> SourceResult<ProbeResponse> {
            Ok(ProbeResponse { status: 200 })
        }
    }

    #[tokio::test]
    async fn test_fetches_in_flight_never_exceed_limit() {
        let config = HttpConfig {
            max_concurrent_fetches: 2,
            ..Default::default()
        };
        let client = Arc::new(GaugeClient::default());
        let fetcher = SubscriptionFetcher::new(client.clone(), &config);
        let urls: Vec<String> = (0..10).map(|i| format!("http://s{i}.example/list.txt")).collect();

        let report = fetcher.fetch_all(&urls).await;
        assert_eq!(report.failed, 0);
        assert_eq!(report.map.url_count(), 10);

        let peak = client.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight fetches was {peak}");
        assert!(peak >= 2, "fetches never overlapped");
    }
}
