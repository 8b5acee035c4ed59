//! Download flow integration tests.
//!
//! These tests drive `SubtitleOrchestrator::download` against mock providers:
//! file cache lookup -> provider lookup -> rate limit -> download -> file cache

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tempfile::TempDir;

use subfinder_core::{
    testing::{fixtures, MockProvider, RecordingErrorReporter},
    DownloadError, DownloadState, MatchType, ProviderClient, ProviderError, ProviderId,
    RateBudget, RateLimiter, ResultCache, ResultCacheConfig, ResultRanker, SearchResult,
    SqliteCacheStore, SubtitleOrchestrator,
};

/// Test helper wiring an orchestrator around mock providers.
struct TestHarness {
    orchestrator: SubtitleOrchestrator,
    cache: Arc<ResultCache>,
    rate_limiter: Arc<RateLimiter>,
    reporter: Arc<RecordingErrorReporter>,
    temp_dir: TempDir,
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
            temp_dir,
        }
    }

    /// A downloadable file outside the managed directory.
    fn downloaded_file(&self, name: &str) -> PathBuf {
        fixtures::write_subtitle(self.temp_dir.path(), name).expect("Failed to write subtitle")
    }

    async fn download(&self, result: &SearchResult) -> Vec<DownloadState> {
        self.orchestrator.download(result).collect().await
    }
}

fn opensubtitles_result(id: &str) -> SearchResult {
    fixtures::search_result(ProviderId::OpenSubtitles, id, "en", MatchType::Title)
}

fn success_path(states: &[DownloadState]) -> PathBuf {
    match states {
        [DownloadState::Loading, DownloadState::Success(path)] => path.clone(),
        other => panic!("unexpected states: {:?}", other),
    }
}

#[tokio::test]
async fn test_download_caches_file() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    let result = opensubtitles_result("42");

    let states = harness.download(&result).await;
    let path = success_path(&states);

    assert!(path.starts_with(harness.temp_dir.path().join("files")));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), fixtures::SAMPLE_SRT);
    assert_eq!(provider.download_calls(), 1);
    assert_eq!(harness.reporter.count(), 0);
}

#[tokio::test]
async fn test_file_cache_hit_contacts_no_provider() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    let result = opensubtitles_result("42");

    let source = harness.downloaded_file("seed.srt");
    let managed = harness.cache.cache_file(&result, &source).await.unwrap();

    let states = harness.download(&result).await;
    assert_eq!(success_path(&states), managed);
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_repeated_download_uses_file_cache() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    let result = opensubtitles_result("42");

    let first = success_path(&harness.download(&result).await);
    let second = success_path(&harness.download(&result).await);

    assert_eq!(first, second);
    assert_eq!(provider.download_calls(), 1);
}

#[tokio::test]
async fn test_rate_limited_download() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    harness.rate_limiter.set_budget(
        ProviderId::OpenSubtitles,
        RateBudget::new(0, Duration::from_secs(60)),
    );

    let states = harness.download(&opensubtitles_result("42")).await;

    assert!(matches!(
        states.as_slice(),
        [DownloadState::Loading, DownloadState::RateLimited]
    ));
    assert_eq!(provider.total_calls(), 0);
    assert_eq!(harness.reporter.count(), 0);
}

#[tokio::test]
async fn test_unconfigured_provider_download() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    let result = fixtures::search_result(ProviderId::Addic7ed, "1", "en", MatchType::Title);

    let states = harness.download(&result).await;

    assert!(matches!(
        states.as_slice(),
        [
            DownloadState::Loading,
            DownloadState::Error(DownloadError::UnconfiguredProvider(ProviderId::Addic7ed))
        ]
    ));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_failed_download_is_reported_once() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_error(ProviderError::ApiError("HTTP 503".to_string()));

    let states = harness.download(&opensubtitles_result("42")).await;

    assert_eq!(states.len(), 2);
    assert!(matches!(states[0], DownloadState::Loading));
    match &states[1] {
        DownloadState::Error(DownloadError::Provider(ProviderError::ApiError(msg))) => {
            assert_eq!(msg, "HTTP 503")
        }
        other => panic!("unexpected state: {:?}", other),
    }
    assert_eq!(provider.download_calls(), 1);
    assert_eq!(harness.reporter.count(), 1);
}

#[tokio::test]
async fn test_provider_returning_missing_file() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.temp_dir.path().join("never-written.srt"));

    let states = harness.download(&opensubtitles_result("42")).await;

    assert!(matches!(
        states.as_slice(),
        [
            DownloadState::Loading,
            DownloadState::Error(DownloadError::Cache(_))
        ]
    ));
    assert_eq!(harness.reporter.count(), 1);
}

#[tokio::test]
async fn test_missing_managed_file_triggers_redownload() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    let result = opensubtitles_result("42");

    let path = success_path(&harness.download(&result).await);
    std::fs::remove_file(&path).unwrap();

    let again = success_path(&harness.download(&result).await);
    assert_eq!(again, path);
    assert!(again.exists());
    assert_eq!(provider.download_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_downloads_of_same_result() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    provider.set_delay(Duration::from_millis(20));
    let result = opensubtitles_result("42");

    let (first, second) = tokio::join!(harness.download(&result), harness.download(&result));
    let first = success_path(&first);
    let second = success_path(&second);

    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(&first).unwrap(), fixtures::SAMPLE_SRT);

    // Only one record stays active; the file survives maintenance.
    let report = harness.orchestrator.perform_cache_maintenance().await.unwrap();
    assert_eq!(report.files_deleted, 0);
    assert!(first.exists());
}

#[tokio::test]
async fn test_download_stream_starts_with_loading() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    provider.set_delay(Duration::from_millis(50));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    let result = opensubtitles_result("42");

    let mut stream = harness.orchestrator.download(&result);
    let first = stream.next().await;
    assert!(matches!(first, Some(DownloadState::Loading)));
    assert_eq!(provider.download_calls(), 0);

    let terminal = stream.next().await.unwrap();
    assert!(terminal.is_terminal());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_clear_cache_forgets_files() {
    let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
    let harness = TestHarness::new(&[provider.clone()]);
    provider.set_download_file(harness.downloaded_file("fresh.srt"));
    let result = opensubtitles_result("42");

    let cleared = success_path(&harness.download(&result).await);
    harness.orchestrator.clear_cache().await.unwrap();
    assert!(!cleared.exists());

    let again = success_path(&harness.download(&result).await);

    assert_eq!(provider.download_calls(), 2);
    assert!(again.exists());
}
