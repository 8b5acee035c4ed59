//! Search and download flows.

use futures::future::{self, join_all};
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{DownloadError, DownloadState, ProviderStatus};
use crate::cache::{CacheError, CacheStatistics, MaintenanceReport, ResultCache};
use crate::metrics;
use crate::provider::{ErrorReporter, ProviderClient, ProviderError};
use crate::ranker::{deduplicate_results, ResultRanker};
use crate::rate_limiter::RateLimiter;
use crate::subtitle::{ProviderId, SearchRequest, SearchResult};

/// Coordinates providers, rate limiting, caching and ranking.
///
/// All collaborators are shared; concurrent calls for different requests
/// only meet in the rate limiter and the cache, both of which are safe to
/// use from many tasks.
pub struct SubtitleOrchestrator {
    providers: Vec<Arc<dyn ProviderClient>>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    ranker: ResultRanker,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl SubtitleOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
        ranker: ResultRanker,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            providers,
            rate_limiter,
            cache,
            ranker,
            error_reporter,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn ranker(&self) -> &ResultRanker {
        &self.ranker
    }

    /// Ranked results for a request.
    ///
    /// Served from the cache when possible. Otherwise every enabled provider
    /// with budget left is queried concurrently; provider failures are
    /// reported and contribute nothing. A request without languages matches
    /// nothing and contacts no provider. Only storage failures are returned.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, CacheError> {
        if request.languages.is_empty() {
            warn!(title = %request.title, "Search request has no languages");
            metrics::SEARCHES_TOTAL.with_label_values(&["no_languages"]).inc();
            return Ok(Vec::new());
        }

        let cached = self.cache.get_cached_results(request)?;
        if !cached.is_empty() {
            metrics::SEARCHES_TOTAL.with_label_values(&["cache_hit"]).inc();
            metrics::SEARCH_RESULTS
                .with_label_values(&[])
                .observe(cached.len() as f64);
            return Ok(cached);
        }

        let candidates: Vec<&Arc<dyn ProviderClient>> = self
            .providers
            .iter()
            .filter(|p| {
                let id = p.provider();
                if !p.is_enabled() {
                    debug!(provider = %id, "Skipping disabled provider");
                    false
                } else if !self.rate_limiter.can_make_request(&id) {
                    debug!(provider = %id, "Skipping rate limited provider");
                    false
                } else {
                    true
                }
            })
            .collect();

        if candidates.is_empty() {
            warn!(title = %request.title, "No provider available for search");
            metrics::SEARCHES_TOTAL.with_label_values(&["no_providers"]).inc();
            return Ok(Vec::new());
        }

        debug!(
            title = %request.title,
            providers = candidates.len(),
            "Starting parallel search"
        );

        let searches = candidates
            .into_iter()
            .map(|provider| self.search_provider(&**provider, request));
        let combined: Vec<SearchResult> = join_all(searches).await.into_iter().flatten().collect();

        let ranked = self.ranker.rank(deduplicate_results(combined), request);
        self.cache.cache_results(request, &ranked)?;

        metrics::SEARCHES_TOTAL.with_label_values(&["cache_miss"]).inc();
        metrics::SEARCH_RESULTS
            .with_label_values(&[])
            .observe(ranked.len() as f64);
        info!(title = %request.title, results = ranked.len(), "Search complete");
        Ok(ranked)
    }

    /// Query one provider, turning any failure into an empty contribution.
    async fn search_provider(
        &self,
        provider: &dyn ProviderClient,
        request: &SearchRequest,
    ) -> Vec<SearchResult> {
        let id = provider.provider();
        self.rate_limiter.record_request(&id);

        let start = Instant::now();
        let outcome = AssertUnwindSafe(provider.search_subtitles(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ProviderError::Panicked(id.clone())));
        observe_provider_call(&id, "search", start, &outcome);

        match outcome {
            Ok(results) => {
                debug!(provider = %id, results = results.len(), "Provider search complete");
                results
            }
            Err(e) => {
                warn!(provider = %id, error = %e, "Provider search failed");
                self.error_reporter.report_error(&e);
                Vec::new()
            }
        }
    }

    /// Download a result's subtitle file.
    ///
    /// The stream yields `Loading` and then one terminal state. Dropping it
    /// early abandons the download before anything is cached.
    pub fn download<'a>(&'a self, result: &'a SearchResult) -> BoxStream<'a, DownloadState> {
        stream::once(future::ready(DownloadState::Loading))
            .chain(stream::once(self.resolve_download(result)))
            .boxed()
    }

    async fn resolve_download(&self, result: &SearchResult) -> DownloadState {
        match self.cache.get_cached_file(result).await {
            Ok(Some(path)) => {
                metrics::DOWNLOADS_TOTAL.with_label_values(&["cache_hit"]).inc();
                return DownloadState::Success(path);
            }
            Ok(None) => {}
            Err(e) => return self.download_failed(e.into()),
        }

        let Some(provider) = self
            .providers
            .iter()
            .find(|p| p.provider() == result.provider)
        else {
            warn!(provider = %result.provider, "Download requested for unconfigured provider");
            metrics::DOWNLOADS_TOTAL.with_label_values(&["error"]).inc();
            return DownloadState::Error(DownloadError::UnconfiguredProvider(
                result.provider.clone(),
            ));
        };

        let id = provider.provider();
        if !self.rate_limiter.can_make_request(&id) {
            debug!(provider = %id, "Download rate limited");
            metrics::DOWNLOADS_TOTAL.with_label_values(&["rate_limited"]).inc();
            return DownloadState::RateLimited;
        }
        self.rate_limiter.record_request(&id);

        let start = Instant::now();
        let downloaded = AssertUnwindSafe(provider.download_subtitle(result))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ProviderError::Panicked(id.clone())));
        observe_provider_call(&id, "download", start, &downloaded);

        let cached = match downloaded {
            Ok(path) => self
                .cache
                .cache_file(result, &path)
                .await
                .map_err(DownloadError::from),
            Err(e) => Err(DownloadError::from(e)),
        };

        match cached {
            Ok(path) => {
                info!(
                    provider = %id,
                    content_id = %result.content_id(),
                    path = %path.display(),
                    "Subtitle downloaded"
                );
                metrics::DOWNLOADS_TOTAL.with_label_values(&["downloaded"]).inc();
                DownloadState::Success(path)
            }
            Err(e) => self.download_failed(e),
        }
    }

    fn download_failed(&self, error: DownloadError) -> DownloadState {
        warn!(error = %error, "Download failed");
        self.error_reporter.report_error(&error);
        metrics::DOWNLOADS_TOTAL.with_label_values(&["error"]).inc();
        DownloadState::Error(error)
    }

    /// Enablement and rate limit state of every registered provider.
    pub fn get_provider_status(&self) -> HashMap<ProviderId, ProviderStatus> {
        self.providers
            .iter()
            .map(|p| {
                let id = p.provider();
                let status = ProviderStatus {
                    enabled: p.is_enabled(),
                    rate_limit: self.rate_limiter.get_status(&id),
                };
                (id, status)
            })
            .collect()
    }

    /// Forget every cached result set and delete the managed files.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear_all().await
    }

    /// Run cache maintenance. Scheduling is left to the host.
    pub async fn perform_cache_maintenance(&self) -> Result<MaintenanceReport, CacheError> {
        self.cache.perform_maintenance().await
    }

    pub fn cache_statistics(&self) -> Result<CacheStatistics, CacheError> {
        self.cache.get_cache_statistics()
    }
}

fn observe_provider_call<T>(
    provider: &ProviderId,
    operation: &str,
    start: Instant,
    outcome: &Result<T, ProviderError>,
) {
    let status = match outcome {
        Ok(_) => "success",
        Err(e) => e.label(),
    };
    metrics::PROVIDER_REQUESTS
        .with_label_values(&[provider.as_str(), operation, status])
        .inc();
    metrics::PROVIDER_DURATION
        .with_label_values(&[provider.as_str(), operation])
        .observe(start.elapsed().as_secs_f64());
}
