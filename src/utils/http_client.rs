use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::errors::{AppResult, SourceError, SourceResult};
use crate::utils::url::UrlUtils;
use crate::utils::{CompressionFormat, DecompressionService};

/// Status line of a liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
}

/// Network seam shared by the subscription fetcher and the validator
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch URL and return decompressed text content
    async fn fetch_text(&self, url: &str) -> SourceResult<String>;

    /// Lightweight reachability check; any answered status is `Ok`
    async fn probe(&self, url: &str, timeout: Duration) -> SourceResult<ProbeResponse>;
}

/// reqwest-backed client with automatic decompression
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    pub fn default_user_agent() -> String {
        format!("m3u-harvest/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Build the shared client from the `[http]` settings
    pub fn new(config: &HttpConfig) -> AppResult<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent);

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self { client })
    }

    async fn process_response_to_bytes(response: Response, url: &str) -> SourceResult<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: UrlUtils::obfuscate_credentials(url),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(&UrlUtils::obfuscate_credentials(url), &e))?;

        debug!("Fetched {} bytes of raw content", bytes.len());

        let compression_format = DecompressionService::detect_compression_format(&bytes);
        match compression_format {
            CompressionFormat::Uncompressed => Ok(bytes.to_vec()),
            _ => {
                debug!("Content is {:?} compressed, decompressing", compression_format);
                DecompressionService::decompress(bytes).map_err(|e| SourceError::Decode {
                    url: UrlUtils::obfuscate_credentials(url),
                    message: e.to_string(),
                })
            }
        }
    }

    /// UTF-8 decode, replacing invalid sequences instead of failing
    pub fn decode_text(bytes: Vec<u8>, url: &str) -> String {
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Content from {} is not valid UTF-8, decoding lossily",
                    UrlUtils::obfuscate_credentials(url)
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }
    }
}

#[async_trait]
impl HttpClient for StandardHttpClient {
    async fn fetch_text(&self, url: &str) -> SourceResult<String> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching text content from: {}", safe_url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&safe_url, &e))?;

        let bytes = Self::process_response_to_bytes(response, url).await?;
        let content = Self::decode_text(bytes, url);

        debug!("Fetched {} characters of text content", content.len());
        Ok(content)
    }

    async fn probe(&self, url: &str, timeout: Duration) -> SourceResult<ProbeResponse> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&UrlUtils::obfuscate_credentials(url), &e))?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
        })
    }
}
