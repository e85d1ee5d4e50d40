/// Configuration default values
///
/// All defaults live here so they can be changed in one place.
// Source defaults
pub const DEFAULT_LOCAL_PATH: &str = "config/local.txt";
pub const DEFAULT_TEMPLATE_PATH: &str = "config/demo.txt";
pub const DEFAULT_SUBSCRIPTION_LIST_PATH: &str = "config/subscribe.txt";

// HTTP defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 10;

// Validation defaults
pub const DEFAULT_VALIDATION_ENABLED: bool = true;
pub const DEFAULT_URLS_PER_CHANNEL: usize = 10;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETAIN_EMPTY_CHANNELS: bool = false;
pub const DEFAULT_CAP_WHEN_DISABLED: bool = false;
pub const DEFAULT_DEDUPLICATE_URLS: bool = true;
pub const DEFAULT_FAIL_OPEN: bool = true;
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 10;
pub const DEFAULT_ACCEPTED_STATUS_CODES: &[&str] = &["2xx", "3xx"];

// Output defaults
pub const DEFAULT_OUTPUT_PATH: &str = "output/result.txt";
pub const DEFAULT_M3U_OUTPUT_PATH: &str = "output/result.m3u";
pub const DEFAULT_INCLUDE_HEADER: bool = true;
pub const DEFAULT_M3U_ENABLED: bool = true;
pub const DEFAULT_M3U_GROUP_TITLE: &str = "Live";
pub const DEFAULT_TIME_ZONE: &str = "Asia/Shanghai";

// Cache defaults
pub const DEFAULT_CACHE_ENABLED: bool = false;
pub const DEFAULT_CACHE_PATH: &str = "output/cache.json.gz";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

// Limits enforced by Config::validate
pub const MAX_URLS_PER_CHANNEL: usize = 1000;
pub const MAX_CONCURRENCY: usize = 1024;
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Prefix for environment variable overrides (`M3U_HARVEST_HTTP__REQUEST_TIMEOUT=5s`)
pub const ENV_PREFIX: &str = "M3U_HARVEST_";
