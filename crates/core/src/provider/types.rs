//! Types for subtitle providers.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::subtitle::{ProviderId, SearchRequest, SearchResult};

/// A source of subtitles (OpenSubtitles, Podnapisi, a local library, ...).
///
/// Implementations own their network timeouts. Errors are reported by the
/// orchestrator and never abort sibling providers.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Identifier used for rate limiting, caching and status reporting.
    fn provider(&self) -> ProviderId;

    /// Whether the provider should be queried at all.
    fn is_enabled(&self) -> bool;

    /// Search for subtitles matching the request.
    async fn search_subtitles(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError>;

    /// Download a subtitle file, returning where it was written.
    ///
    /// The returned file is copied into the managed cache; it may live in a
    /// temporary location.
    async fn download_subtitle(&self, result: &SearchResult) -> Result<PathBuf, ProviderError>;
}

/// Receives failures the orchestrator recovers from.
///
/// Fire-and-forget: implementations must not panic.
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, error: &(dyn std::error::Error + 'static));
}

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Subtitle not found: {0}")]
    NotFound(String),

    #[error("Provider is disabled: {0}")]
    Disabled(ProviderId),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provider {0} panicked")]
    Panicked(ProviderId),
}

impl ProviderError {
    /// Outcome label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderError::ConnectionFailed(_) => "connection_failed",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::Timeout => "timeout",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Disabled(_) => "disabled",
            ProviderError::Io { .. } => "io",
            ProviderError::Panicked(_) => "panicked",
        }
    }
}
