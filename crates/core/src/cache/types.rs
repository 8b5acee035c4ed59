//! Types for cached search results and files.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::subtitle::{ProviderId, SearchResult};

/// A cached, ranked result set for one canonical request key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub cache_key: String,
    pub results: Vec<SearchResult>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after `created_at`.
    pub fn new(
        cache_key: impl Into<String>,
        results: Vec<SearchResult>,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache_key: cache_key.into(),
            results,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A downloaded subtitle file kept in the managed cache directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedFile {
    pub id: i64,
    pub content_id: String,
    pub language: String,
    pub provider: ProviderId,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub checksum: String,
    pub downloaded_at: DateTime<Utc>,
    pub last_access_time: DateTime<Utc>,
    pub access_count: u32,
    /// Inactive records are logically deleted but kept for reconciliation.
    pub is_active: bool,
}

/// Data for recording a newly cached file.
#[derive(Debug, Clone)]
pub struct NewCachedFile {
    pub content_id: String,
    pub language: String,
    pub provider: ProviderId,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub checksum: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Aggregate numbers over the search result cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_entries: u64,
    pub valid_entries: u64,
    pub expired_entries: u64,
    /// Mean number of results per cached search (0 when empty).
    pub avg_results_per_search: f64,
}

/// Outcome of a maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub expired_entries_removed: usize,
    pub files_deactivated: usize,
    pub files_deleted: usize,
}

/// Checksum algorithm used for cached files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumType {
    #[default]
    Sha256,
    Md5,
}
