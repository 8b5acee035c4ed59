//! Search flow integration tests.
//!
//! These tests drive `SubtitleOrchestrator::search` against mock providers:
//! cache lookup -> provider selection -> concurrent fan-out -> ranking -> caching

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use subfinder_core::{
    testing::{fixtures, MockProvider, RecordingErrorReporter},
    MatchType, ProviderClient, ProviderError, ProviderId, RateBudget, RateLimiter, ResultCache,
    ResultCacheConfig, ResultRanker, SearchRequest, SearchResult, SqliteCacheStore,
    SubtitleOrchestrator,
};

/// Test helper wiring an orchestrator around mock providers.
struct TestHarness {
    orchestrator: SubtitleOrchestrator,
    cache: Arc<ResultCache>,
    rate_limiter: Arc<RateLimiter>,
    reporter: Arc<RecordingErrorReporter>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(providers: &[Arc<MockProvider>]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteCacheStore::new(&temp_dir.path().join("cache.db"))
            .expect("Failed to create cache store");
        let cache = Arc::new(ResultCache::new(
            Arc::new(store),
            ResultCacheConfig::new(temp_dir.path().join("files")),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(RateBudget::new(
            10,
            Duration::from_secs(60),
        )));
        let reporter = Arc::new(RecordingErrorReporter::new());

        let clients = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn ProviderClient>)
            .collect();
        let orchestrator = SubtitleOrchestrator::new(
            clients,
            rate_limiter.clone(),
            cache.clone(),
            ResultRanker::default(),
            reporter.clone(),
        );

        Self {
            orchestrator,
            cache,
            rate_limiter,
            reporter,
            _temp_dir: temp_dir,
        }
    }
}

fn provider_with(id: ProviderId, ids: &[&str]) -> Arc<MockProvider> {
    let results = ids
        .iter()
        .map(|result_id| fixtures::search_result(id.clone(), result_id, "en", MatchType::Title))
        .collect();
    Arc::new(MockProvider::with_results(id, results))
}

fn ids(results: &[SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.content_id()).collect()
}

#[test]
fn test_cache_key_ignores_language_order() {
    let a = SearchRequest::movie("Movie A", 2023, ["en", "es"]);
    let b = SearchRequest::movie("Movie A", 2023, ["es", "en"]);
    let c = SearchRequest::movie("Movie B", 2023, ["en", "es"]);

    assert_eq!(a.cache_key(), b.cache_key());
    assert_ne!(a.cache_key(), c.cache_key());
}

#[tokio::test]
async fn test_search_skips_disabled_and_rate_limited_providers() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1", "a2"]);
    let b = provider_with(ProviderId::Podnapisi, &["b1"]);
    let c = provider_with(ProviderId::Subdl, &["c1"]);
    b.set_enabled(false);

    let harness = TestHarness::new(&[a.clone(), b.clone(), c.clone()]);
    harness
        .rate_limiter
        .set_budget(ProviderId::Subdl, RateBudget::new(0, Duration::from_secs(60)));

    let results = harness
        .orchestrator
        .search(&fixtures::movie_request())
        .await
        .unwrap();

    assert_eq!(a.search_calls(), 1);
    assert_eq!(b.search_calls(), 0);
    assert_eq!(c.search_calls(), 0);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.provider == ProviderId::OpenSubtitles));
    assert_eq!(harness.reporter.count(), 0);
}

#[tokio::test]
async fn test_failing_provider_contributes_nothing() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let b = provider_with(ProviderId::Podnapisi, &["b1"]);
    let c = provider_with(ProviderId::Subdl, &["c1", "c2"]);
    b.set_search_error(ProviderError::ConnectionFailed("connection refused".to_string()));

    let harness = TestHarness::new(&[a.clone(), b.clone(), c.clone()]);
    let request = fixtures::movie_request();

    let results = harness.orchestrator.search(&request).await.unwrap();

    let mut union = a.search_subtitles(&request).await.unwrap();
    union.extend(c.search_subtitles(&request).await.unwrap());
    let expected = ResultRanker::default().rank(union, &request);

    assert_eq!(ids(&results), ids(&expected));
    assert_eq!(results, expected);
    assert_eq!(harness.reporter.count(), 1);
    assert!(harness.reporter.messages()[0].contains("connection refused"));
}

#[tokio::test]
async fn test_all_providers_failing_yields_empty_list() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let b = provider_with(ProviderId::Podnapisi, &["b1"]);
    a.set_search_error(ProviderError::Timeout);
    b.set_panic(true);

    let harness = TestHarness::new(&[a, b]);
    let results = harness
        .orchestrator
        .search(&fixtures::movie_request())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(harness.reporter.count(), 2);
    assert_eq!(
        harness.orchestrator.cache_statistics().unwrap().total_entries,
        0
    );
}

#[tokio::test]
async fn test_cache_hit_contacts_no_provider() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let harness = TestHarness::new(&[a.clone()]);
    let request = fixtures::movie_request();

    let seeded = vec![fixtures::search_result(
        ProviderId::Local,
        "seeded",
        "en",
        MatchType::Hash,
    )];
    harness.cache.cache_results(&request, &seeded).unwrap();

    let results = harness.orchestrator.search(&request).await.unwrap();
    assert_eq!(results, seeded);
    assert_eq!(a.total_calls(), 0);

    // Language order does not matter for the cache.
    let reordered = SearchRequest::movie("The Matrix", 1999, ["es", "en"]);
    let results = harness.orchestrator.search(&reordered).await.unwrap();
    assert_eq!(results, seeded);
    assert_eq!(a.total_calls(), 0);
}

#[tokio::test]
async fn test_search_populates_cache() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1", "a2"]);
    let harness = TestHarness::new(&[a.clone()]);
    let request = fixtures::movie_request();

    let first = harness.orchestrator.search(&request).await.unwrap();
    let second = harness.orchestrator.search(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(a.search_calls(), 1);
    assert_eq!(harness.cache.get_cached_results(&request).unwrap(), first);
}

#[tokio::test]
async fn test_empty_results_are_not_cached() {
    let a = provider_with(ProviderId::OpenSubtitles, &[]);
    let harness = TestHarness::new(&[a.clone()]);
    let request = fixtures::movie_request();

    assert!(harness.orchestrator.search(&request).await.unwrap().is_empty());
    assert!(harness.orchestrator.search(&request).await.unwrap().is_empty());

    assert_eq!(a.search_calls(), 2);
    assert_eq!(
        harness.orchestrator.cache_statistics().unwrap().total_entries,
        0
    );
}

#[tokio::test]
async fn test_results_are_ranked() {
    let a = Arc::new(MockProvider::with_results(
        ProviderId::OpenSubtitles,
        vec![
            fixtures::search_result(ProviderId::OpenSubtitles, "fuzzy", "en", MatchType::Fuzzy),
            fixtures::search_result(ProviderId::OpenSubtitles, "spanish", "es", MatchType::Title),
            fixtures::search_result(ProviderId::OpenSubtitles, "hash", "en", MatchType::Hash),
        ],
    ));
    let harness = TestHarness::new(&[a]);

    let results = harness
        .orchestrator
        .search(&fixtures::movie_request())
        .await
        .unwrap();

    assert_eq!(results[0].id, "hash");
    assert!(results
        .windows(2)
        .all(|pair| pair[0].match_score >= pair[1].match_score));
    assert!(results
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.match_score)));
}

#[tokio::test]
async fn test_providers_are_queried_concurrently() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let b = provider_with(ProviderId::Podnapisi, &["b1"]);
    a.set_delay(Duration::from_millis(200));
    b.set_delay(Duration::from_millis(200));
    let harness = TestHarness::new(&[a, b]);

    let start = std::time::Instant::now();
    let results = harness
        .orchestrator
        .search(&fixtures::movie_request())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(start.elapsed() < Duration::from_millis(390));
}

#[tokio::test]
async fn test_concurrent_searches_for_different_requests() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let harness = TestHarness::new(&[a.clone()]);
    let matrix = fixtures::movie_request();
    let show = fixtures::episode_request("Show");

    let (first, second) = tokio::join!(
        harness.orchestrator.search(&matrix),
        harness.orchestrator.search(&show)
    );

    assert_eq!(first.unwrap().len(), 1);
    assert_eq!(second.unwrap().len(), 1);
    assert_eq!(a.search_calls(), 2);
    assert_eq!(
        harness.orchestrator.cache_statistics().unwrap().total_entries,
        2
    );
    let status = harness.orchestrator.get_provider_status();
    assert_eq!(
        status[&ProviderId::OpenSubtitles].rate_limit.requests_remaining,
        8
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_search_writes_nothing() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    a.set_delay(Duration::from_secs(5));
    let harness = TestHarness::new(&[a.clone()]);
    let request = fixtures::movie_request();

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        harness.orchestrator.search(&request),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(a.search_calls(), 1);
    assert!(harness.cache.get_cached_results(&request).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_provider_returns_after_window() {
    let a = provider_with(ProviderId::OpenSubtitles, &["a1"]);
    let harness = TestHarness::new(&[a.clone()]);
    harness.rate_limiter.set_budget(
        ProviderId::OpenSubtitles,
        RateBudget::new(1, Duration::from_secs(60)),
    );

    let show = fixtures::episode_request("Show");
    assert_eq!(
        harness
            .orchestrator
            .search(&fixtures::movie_request())
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(harness.orchestrator.search(&show).await.unwrap().is_empty());
    assert_eq!(a.search_calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;

    assert_eq!(harness.orchestrator.search(&show).await.unwrap().len(), 1);
    assert_eq!(a.search_calls(), 2);
}
