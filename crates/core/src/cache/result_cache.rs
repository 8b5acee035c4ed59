//! Search result and file cache.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::files::store_copy;
use super::{
    CacheEntry, CacheError, CacheStatistics, CacheStore, ChecksumType, MaintenanceReport,
    NewCachedFile,
};
use crate::config::CacheConfig;
use crate::metrics;
use crate::subtitle::{SearchRequest, SearchResult};

/// Settings for `ResultCache`.
#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    /// Root of the managed file directory.
    pub files_dir: PathBuf,
    /// Lifetime of a cached result set.
    pub ttl: Duration,
    /// Minimum age before an unpopular file is evicted.
    pub stale_file_age: Duration,
    /// Files accessed fewer times than this are unpopular.
    pub stale_min_access_count: u32,
    pub checksum: ChecksumType,
}

impl ResultCacheConfig {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self::from(&CacheConfig {
            files_dir: files_dir.into(),
            ..CacheConfig::default()
        })
    }
}

impl From<&CacheConfig> for ResultCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            files_dir: config.files_dir.clone(),
            ttl: Duration::hours(i64::from(config.ttl_hours)),
            stale_file_age: Duration::days(i64::from(config.stale_file_age_days)),
            stale_min_access_count: config.stale_min_access_count,
            checksum: config.checksum,
        }
    }
}

/// Cache for ranked search results and downloaded subtitle files.
///
/// Storage failures are returned to the caller unchanged. A file record whose
/// backing file has disappeared is deactivated on lookup and reported as a
/// miss.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    config: ResultCacheConfig,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, config: ResultCacheConfig) -> Self {
        Self { store, config }
    }

    /// Cached results for a request. An empty list means a miss.
    pub fn get_cached_results(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, CacheError> {
        let key = request.cache_key();
        match self.store.get_entry(&key)? {
            Some(entry) if !entry.is_expired_at(Utc::now()) => {
                debug!(cache_key = %key, results = entry.results.len(), "Result cache hit");
                Ok(entry.results)
            }
            Some(_) => {
                debug!(cache_key = %key, "Result cache entry expired");
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Store results for a request, replacing any previous entry.
    ///
    /// Empty result sets are never stored.
    pub fn cache_results(
        &self,
        request: &SearchRequest,
        results: &[SearchResult],
    ) -> Result<(), CacheError> {
        if results.is_empty() {
            return Ok(());
        }

        let entry = CacheEntry::new(
            request.cache_key(),
            results.to_vec(),
            Utc::now(),
            self.config.ttl,
        );
        self.store.put_entry(&entry)?;
        debug!(cache_key = %entry.cache_key, results = results.len(), "Cached search results");
        Ok(())
    }

    /// Path of a cached copy of `result`'s file, if one is usable.
    pub async fn get_cached_file(
        &self,
        result: &SearchResult,
    ) -> Result<Option<PathBuf>, CacheError> {
        let content_id = result.content_id();
        let Some(file) = self
            .store
            .active_files(&content_id, &result.language)?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        if !is_file(&file.file_path).await {
            warn!(
                content_id = %content_id,
                path = %file.file_path.display(),
                "Cached subtitle file missing, deactivating record"
            );
            self.store.deactivate_file(file.id)?;
            return Ok(None);
        }

        self.store.record_file_access(file.id, Utc::now())?;
        debug!(content_id = %content_id, path = %file.file_path.display(), "File cache hit");
        Ok(Some(file.file_path))
    }

    /// Copy a downloaded file into the managed directory and record it.
    ///
    /// Any active record for the same content, language and provider is
    /// superseded. Managed names carry a checksum prefix, so a copy with new
    /// content never overwrites the file of an older record. Returns the
    /// managed path.
    pub async fn cache_file(
        &self,
        result: &SearchResult,
        source: &Path,
    ) -> Result<PathBuf, CacheError> {
        if !is_file(source).await {
            return Err(CacheError::InvalidInput(format!(
                "source file does not exist: {}",
                source.display()
            )));
        }

        let dir = self.config.files_dir.join(result.provider.slug());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;

        let stem = managed_stem(result);
        let extension = result.format.extension();
        let stored = store_copy(source, &dir, self.config.checksum, |checksum| {
            format!("{}-{}.{}", stem, &checksum[..CHECKSUM_PREFIX_LEN], extension)
        })
        .await?;

        let content_id = result.content_id();
        self.store.replace_file(&NewCachedFile {
            content_id: content_id.clone(),
            language: result.language.clone(),
            provider: result.provider.clone(),
            file_path: stored.path.clone(),
            file_size: stored.size,
            checksum: stored.checksum,
            downloaded_at: Utc::now(),
        })?;

        debug!(
            content_id = %content_id,
            path = %stored.path.display(),
            size = stored.size,
            "Cached subtitle file"
        );
        Ok(stored.path)
    }

    /// Remove expired result sets and evict unpopular old files.
    ///
    /// Files are deleted from disk only once no active record references them.
    pub async fn perform_maintenance(&self) -> Result<MaintenanceReport, CacheError> {
        let now = Utc::now();
        let mut report = MaintenanceReport {
            expired_entries_removed: self.store.delete_expired_entries(now)?,
            ..Default::default()
        };

        let stale = self.store.stale_files(
            now - self.config.stale_file_age,
            self.config.stale_min_access_count,
        )?;
        for file in &stale {
            self.store.deactivate_file(file.id)?;
            report.files_deactivated += 1;
        }

        for path in self.store.orphaned_file_paths()? {
            match fs::remove_file(&path).await {
                Ok(()) => report.files_deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete evicted subtitle file");
                    continue;
                }
            }
            self.store.purge_file_records(&path)?;
        }

        metrics::CACHE_ENTRIES_EXPIRED.inc_by(report.expired_entries_removed as u64);
        metrics::CACHE_FILES_EVICTED.inc_by(report.files_deactivated as u64);
        info!(
            expired_entries = report.expired_entries_removed,
            files_deactivated = report.files_deactivated,
            files_deleted = report.files_deleted,
            "Cache maintenance complete"
        );
        Ok(report)
    }

    pub fn get_cache_statistics(&self) -> Result<CacheStatistics, CacheError> {
        self.store.entry_statistics(Utc::now())
    }

    /// Forget every cached result set and file record, and delete the
    /// managed files they referenced.
    pub async fn clear_all(&self) -> Result<(), CacheError> {
        let paths = self.store.clear_all()?;

        let mut deleted = 0usize;
        for path in &paths {
            match fs::remove_file(path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete cached subtitle file");
                }
            }
        }

        info!(files_deleted = deleted, "Cache cleared");
        Ok(())
    }
}

/// Length of the checksum prefix in managed file names.
const CHECKSUM_PREFIX_LEN: usize = 16;

/// Managed file name stem for a result's content and language.
fn managed_stem(result: &SearchResult) -> String {
    let mut hasher = Sha256::new();
    hasher.update(result.content_id().as_bytes());
    hasher.update([0u8]);
    hasher.update(result.language.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
