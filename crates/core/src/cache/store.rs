//! Storage collaborator used by the result cache.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{CacheEntry, CacheStatistics, CachedFile, NewCachedFile};

/// Errors from the cache and its storage backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Trait for cache storage backends.
///
/// Two logical tables: search result entries keyed by canonical key, and
/// cached file records keyed by an auto-assigned id.
pub trait CacheStore: Send + Sync {
    /// Get the entry for a key, expired or not.
    fn get_entry(&self, cache_key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry for its key.
    fn put_entry(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Delete the entry for a key. Returns whether one existed.
    fn delete_entry(&self, cache_key: &str) -> Result<bool, CacheError>;

    /// Delete entries with `expires_at <= now`. Returns the number deleted.
    fn delete_expired_entries(&self, now: DateTime<Utc>) -> Result<usize, CacheError>;

    /// Entry counts relative to `now`.
    fn entry_statistics(&self, now: DateTime<Utc>) -> Result<CacheStatistics, CacheError>;

    /// Record a cached file. New records are active with zero accesses.
    fn insert_file(&self, file: &NewCachedFile) -> Result<CachedFile, CacheError>;

    /// Active records for a content id and language, most recent first.
    fn active_files(&self, content_id: &str, language: &str)
        -> Result<Vec<CachedFile>, CacheError>;

    /// Mark a record inactive.
    fn deactivate_file(&self, id: i64) -> Result<(), CacheError>;

    /// Supersede every active record for the file's content id, language and
    /// provider with a new active record, as one transaction.
    fn replace_file(&self, file: &NewCachedFile) -> Result<CachedFile, CacheError>;

    /// Increment the access count and set the last access time.
    fn record_file_access(&self, id: i64, at: DateTime<Utc>) -> Result<(), CacheError>;

    /// Active records downloaded before `older_than` with fewer than
    /// `min_access_count` accesses.
    fn stale_files(
        &self,
        older_than: DateTime<Utc>,
        min_access_count: u32,
    ) -> Result<Vec<CachedFile>, CacheError>;

    /// Paths referenced only by inactive records.
    fn orphaned_file_paths(&self) -> Result<Vec<PathBuf>, CacheError>;

    /// Delete the inactive records for `path` once no active record uses it.
    /// Returns the number deleted.
    fn purge_file_records(&self, path: &Path) -> Result<usize, CacheError>;

    /// Remove every entry and file record. Returns the distinct file paths the
    /// removed records referenced.
    fn clear_all(&self) -> Result<Vec<PathBuf>, CacheError>;
}
