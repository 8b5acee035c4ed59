//! Subtitle orchestrator.
//!
//! The orchestrator ties providers, rate limiting, caching and ranking together:
//! - **Search**: cache first, then a concurrent fan-out to every enabled provider
//!   with budget left, joined before ranking
//! - **Download**: file cache first, then a single rate-limited provider call

mod service;
mod types;

pub use service::SubtitleOrchestrator;
pub use types::{DownloadError, DownloadState, ProviderStatus, SetupError};

use std::sync::Arc;
use tracing::info;

use crate::cache::{ResultCache, ResultCacheConfig, SqliteCacheStore};
use crate::config::{validate_config, Config};
use crate::provider::{ErrorReporter, OpenSubtitlesClient, ProviderClient};
use crate::ranker::ResultRanker;
use crate::rate_limiter::RateLimiter;

/// Factory function to create an orchestrator from config
pub fn create_orchestrator(
    config: &Config,
    error_reporter: Arc<dyn ErrorReporter>,
) -> Result<SubtitleOrchestrator, SetupError> {
    validate_config(config)?;

    let store = SqliteCacheStore::new(&config.cache.database_path)?;
    let cache = ResultCache::new(Arc::new(store), ResultCacheConfig::from(&config.cache));

    let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();
    if let Some(opensubtitles) = &config.providers.opensubtitles {
        providers.push(Arc::new(OpenSubtitlesClient::new(opensubtitles.clone())?));
    }

    info!(
        providers = providers.len(),
        database = %config.cache.database_path.display(),
        "Subtitle orchestrator configured"
    );

    Ok(SubtitleOrchestrator::new(
        providers,
        Arc::new(RateLimiter::from_config(&config.rate_limit)),
        Arc::new(cache),
        ResultRanker::new(config.ranker.clone()),
        error_reporter,
    ))
}
