//! Testing utilities and mock implementations.
//!
//! This module provides a mock `ProviderClient` and a recording
//! `ErrorReporter`, allowing the orchestrator to be tested end to end
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use subfinder_core::testing::{fixtures, MockProvider, RecordingErrorReporter};
//!
//! let provider = Arc::new(MockProvider::new(ProviderId::OpenSubtitles));
//! let reporter = Arc::new(RecordingErrorReporter::new());
//!
//! // Configure mock responses
//! provider.set_results(vec![/* results */]);
//! provider.set_search_error(ProviderError::Timeout);
//!
//! // Build a SubtitleOrchestrator with them...
//! ```

mod mock_provider;
mod recording_reporter;

pub use mock_provider::MockProvider;
pub use recording_reporter::RecordingErrorReporter;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::subtitle::{MatchType, ProviderId, SearchRequest, SearchResult, SubtitleFormat};

    /// A short, valid SRT document.
    pub const SAMPLE_SRT: &str = "1\n00:00:01,000 --> 00:00:04,000\nWake up, Neo.\n\n2\n00:00:05,000 --> 00:00:07,500\nThe Matrix has you.\n";

    /// Movie request for "The Matrix" (1999) in English then Spanish.
    pub fn movie_request() -> SearchRequest {
        SearchRequest::movie("The Matrix", 1999, ["en", "es"])
    }

    /// Episode request for S01E02 of a series.
    pub fn episode_request(title: &str) -> SearchRequest {
        SearchRequest::episode(title, 1, 2, ["en"])
    }

    /// Create a test search result with reasonable defaults.
    pub fn search_result(
        provider: ProviderId,
        id: &str,
        language: &str,
        match_type: MatchType,
    ) -> SearchResult {
        let mut result = SearchResult::new(
            id,
            provider.clone(),
            language,
            SubtitleFormat::Srt,
            format!("The.Matrix.1999.{}.{}.srt", provider.slug(), id),
            match_type,
        );
        result.download_url = format!("https://subtitles.example/{}/{}", provider.slug(), id);
        result.download_count = Some(250);
        result.rating = Some(4.0);
        result.file_size = Some(48 * 1024);
        result
    }

    /// Write `SAMPLE_SRT` to `dir/name`.
    pub fn write_subtitle(dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, SAMPLE_SRT)?;
        Ok(path)
    }
}
