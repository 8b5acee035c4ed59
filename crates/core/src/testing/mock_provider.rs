//! Mock subtitle provider for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::provider::{ProviderClient, ProviderError};
use crate::subtitle::{ProviderId, SearchRequest, SearchResult};

/// Mock implementation of the ProviderClient trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable search results and download files
/// - Count calls and record searched requests
/// - Simulate failures, panics, delays and a disabled provider
///
/// # Example
///
/// ```rust,ignore
/// use subfinder_core::testing::{fixtures, MockProvider};
///
/// let provider = MockProvider::new(ProviderId::OpenSubtitles);
/// provider.set_results(vec![
///     fixtures::search_result(ProviderId::OpenSubtitles, "1", "en", MatchType::Hash),
/// ]);
///
/// let results = provider.search_subtitles(&fixtures::movie_request()).await?;
/// assert_eq!(results.len(), 1);
/// assert_eq!(provider.search_calls(), 1);
/// ```
#[derive(Debug)]
pub struct MockProvider {
    id: ProviderId,
    enabled: AtomicBool,
    results: Mutex<Vec<SearchResult>>,
    /// If set, the next search fails with this error.
    next_search_error: Mutex<Option<ProviderError>>,
    /// If set, the next download fails with this error.
    next_download_error: Mutex<Option<ProviderError>>,
    panic_on_call: AtomicBool,
    delay: Mutex<Option<Duration>>,
    download_file: Mutex<Option<PathBuf>>,
    searches: Mutex<Vec<SearchRequest>>,
    search_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockProvider {
    /// Create an enabled mock provider with no results.
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            enabled: AtomicBool::new(true),
            results: Mutex::new(Vec::new()),
            next_search_error: Mutex::new(None),
            next_download_error: Mutex::new(None),
            panic_on_call: AtomicBool::new(false),
            delay: Mutex::new(None),
            download_file: Mutex::new(None),
            searches: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock provider with predefined results.
    pub fn with_results(id: ProviderId, results: Vec<SearchResult>) -> Self {
        let provider = Self::new(id);
        provider.set_results(results);
        provider
    }

    /// Set the results returned by subsequent searches.
    pub fn set_results(&self, results: Vec<SearchResult>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Configure the next search to fail with the given error.
    pub fn set_search_error(&self, error: ProviderError) {
        *self.next_search_error.lock().unwrap() = Some(error);
    }

    /// Configure the next download to fail with the given error.
    pub fn set_download_error(&self, error: ProviderError) {
        *self.next_download_error.lock().unwrap() = Some(error);
    }

    /// Make every call panic.
    pub fn set_panic(&self, panic: bool) {
        self.panic_on_call.store(panic, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// File returned by successful downloads.
    pub fn set_download_file(&self, path: impl Into<PathBuf>) {
        *self.download_file.lock().unwrap() = Some(path.into());
    }

    /// Requests searched so far.
    pub fn recorded_searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Total provider operations invoked.
    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.download_calls()
    }

    async fn simulate(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_call.load(Ordering::SeqCst) {
            panic!("mock provider {} panicked", self.id);
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn provider(&self) -> ProviderId {
        self.id.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn search_subtitles(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searches.lock().unwrap().push(request.clone());
        self.simulate().await;

        let error = self.next_search_error.lock().unwrap().take();
        if let Some(err) = error {
            return Err(err);
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn download_subtitle(&self, result: &SearchResult) -> Result<PathBuf, ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await;

        let error = self.next_download_error.lock().unwrap().take();
        if let Some(err) = error {
            return Err(err);
        }
        let file = self.download_file.lock().unwrap().clone();
        file.ok_or_else(|| ProviderError::NotFound(result.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::MatchType;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_mock_provider_returns_results() {
        let provider = MockProvider::with_results(
            ProviderId::Subdl,
            vec![fixtures::search_result(ProviderId::Subdl, "1", "en", MatchType::Title)],
        );

        let results = provider
            .search_subtitles(&fixtures::movie_request())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(provider.search_calls(), 1);
        assert_eq!(provider.recorded_searches()[0].title, "The Matrix");
    }

    #[tokio::test]
    async fn test_mock_provider_error_is_one_shot() {
        let provider = MockProvider::new(ProviderId::Subdl);
        provider.set_search_error(ProviderError::Timeout);

        assert!(provider.search_subtitles(&fixtures::movie_request()).await.is_err());
        assert!(provider.search_subtitles(&fixtures::movie_request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_provider_download_without_file() {
        let provider = MockProvider::new(ProviderId::Subdl);
        let result = fixtures::search_result(ProviderId::Subdl, "7", "en", MatchType::Title);

        let err = provider.download_subtitle(&result).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(id) if id == "7"));
        assert_eq!(provider.download_calls(), 1);
    }
}
