//! SQLite-backed query cache
//!
//! Gateway results are cached per query: one partition per record kind,
//! keyed by the query shape (list with/without relations, or a single
//! record with its read options). Any successful mutation drops the whole
//! partition of its kind.
//!
//! The cache is user-local and disposable. A schema version mismatch simply
//! rebuilds it, and entries older than the configured maximum age count as
//! misses.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use miette::Diagnostic;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use thiserror::Error;

use crate::core::identity::RecordKind;
use crate::core::record::ReadOptions;

/// Current schema version; any other version triggers a rebuild
const SCHEMA_VERSION: i32 = 1;

/// Errors from the query cache
#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    #[diagnostic(
        code(fieldbook::cache::sqlite),
        help("Run `fieldbook cache clear` or pass --no-cache")
    )]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create cache directory {path}: {source}")]
    #[diagnostic(code(fieldbook::cache::io))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache payload: {0}")]
    #[diagnostic(code(fieldbook::cache::payload))]
    Payload(#[from] serde_json::Error),
}

/// Identifies one cached query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub partition: RecordKind,
    pub query: String,
}

impl CacheKey {
    /// Key for a full list read
    pub fn list(kind: RecordKind, with_relations: bool) -> Self {
        Self {
            partition: kind,
            query: format!("list;rel={}", u8::from(with_relations)),
        }
    }

    /// Key for a single-record read
    pub fn record(kind: RecordKind, id: &str, options: ReadOptions) -> Self {
        Self {
            partition: kind,
            query: format!("get;{};{}", options.cache_fragment(), id),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub stale_entries: usize,
    pub by_partition: BTreeMap<String, usize>,
    pub db_size_bytes: u64,
}

/// The query cache backed by SQLite
pub struct QueryCache {
    conn: Connection,
    path: Option<PathBuf>,
    max_age: Duration,
}

impl QueryCache {
    /// Open or create the cache file at `path`
    pub fn open(path: &Path, max_age: Duration) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut cache = Self {
            conn,
            path: Some(path.to_path_buf()),
            max_age,
        };
        cache.prepare_schema()?;
        Ok(cache)
    }

    /// Cache that lives only as long as the value (tests, --no-cache runs)
    pub fn in_memory(max_age: Duration) -> Result<Self, CacheError> {
        let mut cache = Self {
            conn: Connection::open_in_memory()?,
            path: None,
            max_age,
        };
        cache.prepare_schema()?;
        Ok(cache)
    }

    /// Location of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn prepare_schema(&mut self) -> Result<(), CacheError> {
        let current_version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == SCHEMA_VERSION {
            return Ok(());
        }

        if current_version != 0 {
            log::debug!(
                "cache schema v{} != v{}, rebuilding",
                current_version,
                SCHEMA_VERSION
            );
        }

        self.conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS schema_version;
            DROP TABLE IF EXISTS queries;

            CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE queries (
                partition TEXT NOT NULL,
                query TEXT NOT NULL,
                payload TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                PRIMARY KEY (partition, query)
            );
            "#,
        )?;
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Look up a fresh entry
    pub fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, fetched_at FROM queries WHERE partition = ?1 AND query = ?2",
                params![key.partition.as_str(), key.query],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((payload, fetched_at)) if self.is_fresh(fetched_at) => {
                log::debug!("cache hit {} {}", key.partition, key.query);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            Some(_) => {
                log::debug!("cache stale {} {}", key.partition, key.query);
                Ok(None)
            }
            None => {
                log::debug!("cache miss {} {}", key.partition, key.query);
                Ok(None)
            }
        }
    }

    /// Store a query result
    pub fn put(&self, key: &CacheKey, payload: &Value) -> Result<(), CacheError> {
        self.put_at(key, payload, Utc::now().timestamp())
    }

    fn put_at(&self, key: &CacheKey, payload: &Value, fetched_at: i64) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO queries (partition, query, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key.partition.as_str(),
                key.query,
                serde_json::to_string(payload)?,
                fetched_at
            ],
        )?;
        Ok(())
    }

    /// Drop every entry of a partition, returning how many were removed
    pub fn invalidate(&self, kind: RecordKind) -> Result<usize, CacheError> {
        let removed = self.conn.execute(
            "DELETE FROM queries WHERE partition = ?1",
            params![kind.as_str()],
        )?;
        log::debug!("cache invalidated {} ({} entries)", kind, removed);
        Ok(removed)
    }

    /// Drop every entry
    pub fn clear(&self) -> Result<usize, CacheError> {
        Ok(self.conn.execute("DELETE FROM queries", [])?)
    }

    /// Get cache statistics
    pub fn statistics(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();

        {
            let mut stmt = self
                .conn
                .prepare("SELECT partition, COUNT(*) FROM queries GROUP BY partition")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?;

            for row in rows {
                let (partition, count) = row?;
                stats.total_entries += count;
                stats.by_partition.insert(partition, count);
            }
        }

        stats.stale_entries = self.conn.query_row(
            "SELECT COUNT(*) FROM queries WHERE fetched_at < ?1",
            params![self.cutoff()],
            |row| row.get(0),
        )?;

        stats.db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(stats)
    }

    fn cutoff(&self) -> i64 {
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_sub(max_age)
    }

    fn is_fresh(&self, fetched_at: i64) -> bool {
        fetched_at >= self.cutoff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn cache() -> QueryCache {
        QueryCache::in_memory(Duration::from_secs(300)).unwrap()
    }

    #[test]
    fn test_put_then_get() {
        let cache = cache();
        let key = CacheKey::list(RecordKind::Crop, false);
        cache.put(&key, &json!([{"crop_id": 1}])).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(json!([{"crop_id": 1}])));
    }

    #[test]
    fn test_keys_distinguish_query_shape() {
        let cache = cache();
        cache
            .put(&CacheKey::list(RecordKind::Field, false), &json!([]))
            .unwrap();
        assert!(cache
            .get(&CacheKey::list(RecordKind::Field, true))
            .unwrap()
            .is_none());
        assert!(cache
            .get(&CacheKey::list(RecordKind::Crop, false))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalidate_drops_whole_partition() {
        let cache = cache();
        cache
            .put(&CacheKey::list(RecordKind::Crop, false), &json!([]))
            .unwrap();
        cache
            .put(
                &CacheKey::record(RecordKind::Crop, "7", ReadOptions::default()),
                &json!({"crop_id": 7}),
            )
            .unwrap();
        cache
            .put(&CacheKey::list(RecordKind::FieldWork, false), &json!([]))
            .unwrap();

        assert_eq!(cache.invalidate(RecordKind::Crop).unwrap(), 2);
        let stats = cache.statistics().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.by_partition.get("field-works"), Some(&1));
    }

    #[test]
    fn test_stale_entries_are_misses() {
        let cache = cache();
        let key = CacheKey::list(RecordKind::Field, false);
        let old = Utc::now().timestamp() - 3600;
        cache.put_at(&key, &json!([]), old).unwrap();

        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.statistics().unwrap().stale_entries, 1);
    }

    #[test]
    fn test_file_cache_persists() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("queries.db");
        let key = CacheKey::list(RecordKind::Field, true);

        {
            let cache = QueryCache::open(&path, Duration::from_secs(300)).unwrap();
            cache.put(&key, &json!([{"field_name": "North-40"}])).unwrap();
        }

        let cache = QueryCache::open(&path, Duration::from_secs(300)).unwrap();
        assert!(cache.get(&key).unwrap().is_some());
        assert!(cache.statistics().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_version_mismatch_rebuilds() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("queries.db");
        let key = CacheKey::list(RecordKind::Crop, false);

        {
            let cache = QueryCache::open(&path, Duration::from_secs(300)).unwrap();
            cache.put(&key, &json!([])).unwrap();
            cache
                .conn
                .execute("UPDATE schema_version SET version = 0", [])
                .unwrap();
        }

        let cache = QueryCache::open(&path, Duration::from_secs(300)).unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = cache();
        cache
            .put(&CacheKey::list(RecordKind::Crop, false), &json!([]))
            .unwrap();
        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.statistics().unwrap().total_entries, 0);
    }
}
