use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::ChecksumType;
use crate::ranker::RankerConfig;
use crate::subtitle::ProviderId;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Result and file cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// SQLite database holding cached search results and file records
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
    /// Directory where downloaded subtitle files are kept
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
    /// Lifetime of a cached search result set (default: 24)
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
    /// Files downloaded longer ago than this are candidates for eviction (default: 30)
    #[serde(default = "default_stale_file_age_days")]
    pub stale_file_age_days: u32,
    /// Candidates accessed fewer times than this are evicted (default: 2)
    #[serde(default = "default_stale_min_access_count")]
    pub stale_min_access_count: u32,
    /// Checksum recorded for cached files
    #[serde(default)]
    pub checksum: ChecksumType,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            files_dir: default_files_dir(),
            ttl_hours: default_ttl_hours(),
            stale_file_age_days: default_stale_file_age_days(),
            stale_min_access_count: default_stale_min_access_count(),
            checksum: ChecksumType::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("subfinder.db")
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("subtitles")
}

fn default_ttl_hours() -> u32 {
    24
}

fn default_stale_file_age_days() -> u32 {
    30
}

fn default_stale_min_access_count() -> u32 {
    2
}

/// Rate limit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window for providers without an override (default: 40)
    #[serde(default = "default_requests")]
    pub default_requests: u32,
    /// Window length in seconds (default: 10)
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,
    /// Per-provider overrides
    #[serde(default)]
    pub providers: Vec<ProviderRateLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_requests: default_requests(),
            default_window_secs: default_window_secs(),
            providers: Vec::new(),
        }
    }
}

fn default_requests() -> u32 {
    40
}

fn default_window_secs() -> u64 {
    10
}

/// Rate limit override for one provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderRateLimit {
    pub provider: ProviderId,
    pub requests: u32,
    pub window_secs: u64,
}

/// Provider backends
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub opensubtitles: Option<OpenSubtitlesConfig>,
}

/// OpenSubtitles REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenSubtitlesConfig {
    /// API base URL (default: "https://api.opensubtitles.com")
    #[serde(default = "default_opensubtitles_url")]
    pub url: String,
    /// API key sent in the `Api-Key` header
    pub api_key: String,
    /// User agent registered with OpenSubtitles
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Where downloaded files land before they are moved into the cache
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_opensubtitles_url() -> String {
    "https://api.opensubtitles.com".to_string()
}

fn default_user_agent() -> String {
    format!("subfinder v{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u32 {
    30
}

fn default_enabled() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("subfinder-downloads")
}
