pub mod cache;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod ranker;
pub mod rate_limiter;
pub mod subtitle;
pub mod testing;

pub use cache::{
    CacheError, CacheStatistics, CacheStore, CachedFile, MaintenanceReport, ResultCache,
    ResultCacheConfig, SqliteCacheStore,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use orchestrator::{
    create_orchestrator, DownloadError, DownloadState, ProviderStatus, SetupError,
    SubtitleOrchestrator,
};
pub use provider::{
    ErrorReporter, OpenSubtitlesClient, ProviderClient, ProviderError, TracingErrorReporter,
};
pub use ranker::{RankerConfig, ResultRanker, ScoreBreakdown};
pub use rate_limiter::{RateBudget, RateLimitStatus, RateLimiter};
pub use subtitle::{
    ContentType, MatchType, ProviderId, SearchRequest, SearchResult, SubtitleFormat,
};
