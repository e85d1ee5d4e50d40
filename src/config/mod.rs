use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::ConfigError;
use crate::utils::status_code_matcher;
use defaults::*;

/// Complete, validated configuration for one harvester run
///
/// Built once at startup and passed by reference into every stage; nothing
/// reads configuration from global state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub http: HttpConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Where the three producers read from, and whether they run at all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Locally curated `channel,url` file
    pub local_path: PathBuf,
    /// Bundled template file
    pub template_path: PathBuf,
    /// One subscription URL per line
    pub subscription_list_path: PathBuf,
    pub local_enabled: bool,
    pub subscription_enabled: bool,
    pub template_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall timeout for a single subscription fetch
    #[serde(with = "duration_serde::duration")]
    pub request_timeout: Duration,
    /// Overrides the default `m3u-harvest/<version>` user agent
    pub user_agent: Option<String>,
    /// Subscriptions fetched at the same time
    pub max_concurrent_fetches: usize,
}

/// Liveness filtering policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Probe URLs at all; when false the validator passes the map through
    pub enabled: bool,
    /// Maximum URLs kept per channel, earliest first
    pub urls_per_channel: usize,
    #[serde(with = "duration_serde::duration")]
    pub probe_timeout: Duration,
    /// Keep channels whose URLs were all filtered out
    pub retain_empty_channels: bool,
    /// Apply `urls_per_channel` even when `enabled` is false
    pub cap_when_disabled: bool,
    /// Drop repeated URLs within a channel before applying the cap
    pub deduplicate_urls: bool,
    /// Treat probe errors and timeouts as reachable
    pub fail_open: bool,
    /// Probes in flight at once
    pub max_concurrent_probes: usize,
    /// Status patterns counted as reachable ("2xx", "206", ...)
    pub accepted_status_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Emit the title/timestamp/count comment block
    pub include_header: bool,
    /// Also write an extended M3U playlist
    pub m3u_enabled: bool,
    pub m3u_path: PathBuf,
    /// `group-title` attribute written on every playlist entry
    pub m3u_group_title: String,
    /// IANA zone used for the generation timestamp
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// How long a recorded probe outcome stays valid
    #[serde(with = "duration_serde::duration")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write daily-rotated log files here in addition to stdout
    pub directory: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            subscription_list_path: PathBuf::from(DEFAULT_SUBSCRIPTION_LIST_PATH),
            local_enabled: true,
            subscription_enabled: true,
            template_enabled: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_VALIDATION_ENABLED,
            urls_per_channel: DEFAULT_URLS_PER_CHANNEL,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            retain_empty_channels: DEFAULT_RETAIN_EMPTY_CHANNELS,
            cap_when_disabled: DEFAULT_CAP_WHEN_DISABLED,
            deduplicate_urls: DEFAULT_DEDUPLICATE_URLS,
            fail_open: DEFAULT_FAIL_OPEN,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            accepted_status_codes: DEFAULT_ACCEPTED_STATUS_CODES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            include_header: DEFAULT_INCLUDE_HEADER,
            m3u_enabled: DEFAULT_M3U_ENABLED,
            m3u_path: PathBuf::from(DEFAULT_M3U_OUTPUT_PATH),
            m3u_group_title: DEFAULT_M3U_GROUP_TITLE.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_CACHE_ENABLED,
            path: PathBuf::from(DEFAULT_CACHE_PATH),
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl OutputConfig {
    /// Parsed time zone; only fails before `Config::validate` has run
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.time_zone.parse::<Tz>().map_err(|e| {
            ConfigError::invalid("output.time_zone", format!("'{}': {e}", self.time_zone))
        })
    }
}

impl Config {
    /// Load and validate configuration
    ///
    /// A missing file is created with the defaults. Environment variables
    /// prefixed with `M3U_HARVEST_` override file values, `__` separating
    /// section and key.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> Result<Self, ConfigError> {
        let config_file = config_file.as_ref();
        if !config_file.exists() {
            Self::write_default(config_file)?;
            info!("Created default config file: {}", config_file.display());
        }

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no file or environment layers)
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(contents))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn write_default(config_file: &Path) -> Result<(), ConfigError> {
        let contents = Self::default().to_toml()?;
        if let Some(parent) = config_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Load(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(config_file, contents)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", config_file.display())))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Reject out-of-range values up front instead of falling back at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validation;
        if v.urls_per_channel == 0 || v.urls_per_channel > MAX_URLS_PER_CHANNEL {
            return Err(ConfigError::invalid(
                "validation.urls_per_channel",
                format!("must be between 1 and {MAX_URLS_PER_CHANNEL}, got {}", v.urls_per_channel),
            ));
        }
        check_concurrency("validation.max_concurrent_probes", v.max_concurrent_probes)?;
        check_concurrency("http.max_concurrent_fetches", self.http.max_concurrent_fetches)?;
        check_timeout("validation.probe_timeout", v.probe_timeout)?;
        check_timeout("http.request_timeout", self.http.request_timeout)?;

        if v.accepted_status_codes.is_empty() {
            return Err(ConfigError::invalid(
                "validation.accepted_status_codes",
                "at least one status pattern is required",
            ));
        }
        if let Some(bad) = v
            .accepted_status_codes
            .iter()
            .find(|p| !status_code_matcher::is_valid_pattern(p))
        {
            return Err(ConfigError::invalid(
                "validation.accepted_status_codes",
                format!("'{bad}' is neither a status code nor an 'Nxx' range"),
            ));
        }

        if let Some(agent) = &self.http.user_agent {
            if agent.trim().is_empty() {
                return Err(ConfigError::invalid("http.user_agent", "must not be blank"));
            }
        }

        self.output.tz()?;
        Ok(())
    }
}

fn check_concurrency(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_CONCURRENCY {
        return Err(ConfigError::invalid(
            field,
            format!("must be between 1 and {MAX_CONCURRENCY}, got {value}"),
        ));
    }
    Ok(())
}

fn check_timeout(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() || value > Duration::from_secs(MAX_TIMEOUT_SECS) {
        return Err(ConfigError::invalid(
            field,
            format!(
                "must be greater than 0 and at most {MAX_TIMEOUT_SECS}s, got {}",
                humantime::format_duration(value)
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.validation.urls_per_channel, 10);
        assert_eq!(config.validation.accepted_status_codes, ["2xx", "3xx"]);
        assert!(config.validation.fail_open);
        assert!(!config.validation.retain_empty_channels);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [validation]
            urls_per_channel = 3
            probe_timeout = "2s"
            "#,
        )
        .unwrap();

        assert_eq!(config.validation.urls_per_channel, 3);
        assert_eq!(config.validation.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.http.request_timeout, Duration::from_secs(10));
        assert_eq!(config.output.time_zone, "Asia/Shanghai");
    }

    #[test]
    fn test_rejects_zero_cap() {
        let err = Config::from_toml_str("[validation]\nurls_per_channel = 0\n").unwrap_err();
        assert!(err.to_string().contains("validation.urls_per_channel"));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = Config::from_toml_str("[validation]\nmax_concurrent_probes = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_concurrent_probes"));
    }

    #[test]
    fn test_rejects_unknown_time_zone() {
        let err = Config::from_toml_str("[output]\ntime_zone = \"Mars/Olympus\"\n").unwrap_err();
        assert!(err.to_string().contains("output.time_zone"));
    }

    #[test]
    fn test_rejects_bad_status_pattern() {
        let err = Config::from_toml_str("[validation]\naccepted_status_codes = [\"2x\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("accepted_status_codes"));
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from_file(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.sources, SourcesConfig::default());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[validation]"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.validation.enabled = false;
        config.cache.ttl = Duration::from_secs(120);

        let rendered = config.to_toml().unwrap();
        let parsed = Config::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
