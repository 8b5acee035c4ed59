//! Types for the subtitle orchestrator.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::rate_limiter::RateLimitStatus;
use crate::subtitle::ProviderId;

/// Progress of a download.
///
/// A download stream yields `Loading` first and then exactly one of the
/// terminal states.
#[derive(Debug)]
pub enum DownloadState {
    Loading,
    /// The subtitle is available at this managed path.
    Success(PathBuf),
    /// The provider has no budget left; nothing was attempted.
    RateLimited,
    Error(DownloadError),
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DownloadState::Loading)
    }
}

/// Why a download failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No registered client serves the result's provider.
    #[error("no client configured for provider {0}")]
    UnconfiguredProvider(ProviderId),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Diagnostic snapshot of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub enabled: bool,
    pub rate_limit: RateLimitStatus,
}

/// Errors building an orchestrator from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}
