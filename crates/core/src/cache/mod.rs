//! Two-tier subtitle cache.
//!
//! Search result sets are cached per canonical request key with a fixed TTL.
//! Downloaded files are copied into a managed directory and tracked as
//! `CachedFile` records that are soft-deleted first, so the cache can
//! reconcile with the filesystem lazily. Maintenance deletes a file once no
//! active record uses it and then purges its inactive records.

mod files;
mod result_cache;
mod sqlite;
mod store;
mod types;

pub use result_cache::{ResultCache, ResultCacheConfig};
pub use sqlite::SqliteCacheStore;
pub use store::{CacheError, CacheStore};
pub use types::*;
