//! SQLite-backed cache store implementation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CacheEntry, CacheError, CacheStatistics, CacheStore, CachedFile, NewCachedFile};
use crate::subtitle::{ProviderId, SearchResult};

const FILE_COLUMNS: &str = "id, content_id, language, provider, file_path, file_size, checksum, downloaded_at, last_access_time, access_count, is_active";

/// SQLite-backed cache store.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Create a new SQLite cache store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        let conn = Connection::open(path).map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite cache store (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS search_cache (
                cache_key TEXT PRIMARY KEY,
                results TEXT NOT NULL,
                result_count INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_cache_expires_at ON search_cache(expires_at);

            CREATE TABLE IF NOT EXISTS cached_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id TEXT NOT NULL,
                language TEXT NOT NULL,
                provider TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                checksum TEXT NOT NULL,
                downloaded_at INTEGER NOT NULL,
                last_access_time INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_cached_files_lookup ON cached_files(content_id, language, is_active);
            CREATE INDEX IF NOT EXISTS idx_cached_files_path ON cached_files(file_path);
            "#,
        )
        .map_err(db_error)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<CachedFile> {
        let provider: String = row.get(3)?;
        let file_path: String = row.get(4)?;
        let file_size: i64 = row.get(5)?;
        Ok(CachedFile {
            id: row.get(0)?,
            content_id: row.get(1)?,
            language: row.get(2)?,
            provider: ProviderId::from(provider),
            file_path: PathBuf::from(file_path),
            file_size: file_size.max(0) as u64,
            checksum: row.get(6)?,
            downloaded_at: from_millis(row.get(7)?),
            last_access_time: from_millis(row.get(8)?),
            access_count: row.get(9)?,
            is_active: row.get(10)?,
        })
    }

    fn query_files(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CachedFile>, CacheError> {
        let mut stmt = conn.prepare(sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params, Self::row_to_file)
            .map_err(db_error)?;

        let mut files = Vec::new();
        for row_result in rows {
            files.push(row_result.map_err(db_error)?);
        }
        Ok(files)
    }

    fn insert_file_row(conn: &Connection, file: &NewCachedFile) -> Result<CachedFile, CacheError> {
        let downloaded_at = file.downloaded_at.timestamp_millis();

        conn.execute(
            "INSERT INTO cached_files (content_id, language, provider, file_path, file_size, checksum, downloaded_at, last_access_time, access_count, is_active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 1)",
            params![
                file.content_id,
                file.language,
                file.provider.as_str(),
                file.file_path.to_string_lossy(),
                file.file_size as i64,
                file.checksum,
                downloaded_at,
                downloaded_at,
            ],
        )
        .map_err(db_error)?;

        Ok(CachedFile {
            id: conn.last_insert_rowid(),
            content_id: file.content_id.clone(),
            language: file.language.clone(),
            provider: file.provider.clone(),
            file_path: file.file_path.clone(),
            file_size: file.file_size,
            checksum: file.checksum.clone(),
            downloaded_at: from_millis(downloaded_at),
            last_access_time: from_millis(downloaded_at),
            access_count: 0,
            is_active: true,
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get_entry(&self, cache_key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn()?;

        let result = conn.query_row(
            "SELECT results, created_at, expires_at FROM search_cache WHERE cache_key = ?",
            params![cache_key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        );

        let (results_json, created_at, expires_at) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(db_error(e)),
        };

        let results: Vec<SearchResult> = serde_json::from_str(&results_json)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        Ok(Some(CacheEntry {
            cache_key: cache_key.to_string(),
            results,
            created_at: from_millis(created_at),
            expires_at: from_millis(expires_at),
        }))
    }

    fn put_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let results_json = serde_json::to_string(&entry.results)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO search_cache (cache_key, results, result_count, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
            params![
                entry.cache_key,
                results_json,
                entry.results.len() as i64,
                entry.created_at.timestamp_millis(),
                entry.expires_at.timestamp_millis(),
            ],
        )
        .map_err(db_error)?;
        Ok(())
    }

    fn delete_entry(&self, cache_key: &str) -> Result<bool, CacheError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM search_cache WHERE cache_key = ?",
                params![cache_key],
            )
            .map_err(db_error)?;
        Ok(deleted > 0)
    }

    fn delete_expired_entries(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM search_cache WHERE expires_at <= ?",
            params![now.timestamp_millis()],
        )
        .map_err(db_error)
    }

    fn entry_statistics(&self, now: DateTime<Utc>) -> Result<CacheStatistics, CacheError> {
        let conn = self.conn()?;
        let (total, valid, avg): (i64, i64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN expires_at > ?1 THEN 1 ELSE 0 END), 0), COALESCE(AVG(result_count), 0.0) FROM search_cache",
                params![now.timestamp_millis()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(db_error)?;

        Ok(CacheStatistics {
            total_entries: total as u64,
            valid_entries: valid as u64,
            expired_entries: (total - valid) as u64,
            avg_results_per_search: avg,
        })
    }

    fn insert_file(&self, file: &NewCachedFile) -> Result<CachedFile, CacheError> {
        let conn = self.conn()?;
        Self::insert_file_row(&conn, file)
    }

    fn active_files(
        &self,
        content_id: &str,
        language: &str,
    ) -> Result<Vec<CachedFile>, CacheError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM cached_files WHERE content_id = ? AND language = ? AND is_active = 1 ORDER BY downloaded_at DESC, id DESC",
            FILE_COLUMNS
        );
        Self::query_files(&conn, &sql, params![content_id, language])
    }

    fn deactivate_file(&self, id: i64) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE cached_files SET is_active = 0 WHERE id = ?",
            params![id],
        )
        .map_err(db_error)?;
        Ok(())
    }

    fn replace_file(&self, file: &NewCachedFile) -> Result<CachedFile, CacheError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;
        tx.execute(
            "UPDATE cached_files SET is_active = 0 WHERE content_id = ? AND language = ? AND provider = ? AND is_active = 1",
            params![file.content_id, file.language, file.provider.as_str()],
        )
        .map_err(db_error)?;
        let inserted = Self::insert_file_row(&tx, file)?;
        tx.commit().map_err(db_error)?;
        Ok(inserted)
    }

    fn record_file_access(&self, id: i64, at: DateTime<Utc>) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE cached_files SET access_count = access_count + 1, last_access_time = ? WHERE id = ?",
            params![at.timestamp_millis(), id],
        )
        .map_err(db_error)?;
        Ok(())
    }

    fn stale_files(
        &self,
        older_than: DateTime<Utc>,
        min_access_count: u32,
    ) -> Result<Vec<CachedFile>, CacheError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM cached_files WHERE is_active = 1 AND downloaded_at < ? AND access_count < ? ORDER BY downloaded_at ASC",
            FILE_COLUMNS
        );
        Self::query_files(
            &conn,
            &sql,
            params![older_than.timestamp_millis(), min_access_count],
        )
    }

    fn orphaned_file_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT file_path FROM cached_files WHERE file_path NOT IN (SELECT file_path FROM cached_files WHERE is_active = 1)",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_error)?;

        let mut paths = Vec::new();
        for row_result in rows {
            paths.push(PathBuf::from(row_result.map_err(db_error)?));
        }
        Ok(paths)
    }

    fn purge_file_records(&self, path: &Path) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM cached_files WHERE file_path = ?1 AND is_active = 0 AND NOT EXISTS (SELECT 1 FROM cached_files WHERE file_path = ?1 AND is_active = 1)",
            params![path.to_string_lossy()],
        )
        .map_err(db_error)
    }

    fn clear_all(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;

        let mut paths = Vec::new();
        {
            let mut stmt = tx
                .prepare("SELECT DISTINCT file_path FROM cached_files")
                .map_err(db_error)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_error)?;
            for row_result in rows {
                paths.push(PathBuf::from(row_result.map_err(db_error)?));
            }
        }

        tx.execute_batch("DELETE FROM search_cache; DELETE FROM cached_files;")
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        Ok(paths)
    }
}

fn db_error(e: rusqlite::Error) -> CacheError {
    CacheError::Database(e.to_string())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
