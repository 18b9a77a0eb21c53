//! Catalog Cache Store
//!
//! Holds the last good catalog snapshot with a time-to-live.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// CACHE TRAIT
// ============================================================================

/// Key-less snapshot cache (get / set-with-TTL / delete)
pub trait CatalogCache: Send + Sync {
    /// Serialized snapshot, `None` when absent or expired
    fn get(&self) -> Result<Option<String>, CacheError>;
    fn set(&self, snapshot: &str, ttl: Duration) -> Result<(), CacheError>;
    fn delete(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    Io(String),
    Serialization(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "IO Error: {}", e),
            CacheError::Serialization(e) => write!(f, "Serialization Error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// What actually lands on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEnvelope {
    stored_at: i64,
    ttl_secs: u64,
    snapshot: String,
}

impl CacheEnvelope {
    fn new(snapshot: &str, ttl: Duration) -> Self {
        Self {
            stored_at: Utc::now().timestamp(),
            ttl_secs: ttl.as_secs(),
            snapshot: snapshot.to_string(),
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        let age = now.saturating_sub(self.stored_at);
        age < 0 || age as u64 >= self.ttl_secs
    }
}

// ============================================================================
// FILE CACHE
// ============================================================================

/// JSON file cache under the local data directory
#[derive(Debug, Clone)]
pub struct FileCatalogCache {
    path: PathBuf,
}

impl FileCatalogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogCache for FileCatalogCache {
    fn get(&self) -> Result<Option<String>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.path)?;
        let envelope: CacheEnvelope = serde_json::from_slice(&data)?;

        if envelope.is_expired(Utc::now().timestamp()) {
            log::debug!("Catalog cache expired: {:?}", self.path);
            return Ok(None);
        }
        Ok(Some(envelope.snapshot))
    }

    fn set(&self, snapshot: &str, ttl: Duration) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(&CacheEnvelope::new(snapshot, ttl))?;

        // Write-then-rename so a crash never leaves half a snapshot behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// MEMORY CACHE
// ============================================================================

/// Process-local cache for hosts without a writable disk
#[derive(Debug, Default)]
pub struct MemoryCatalogCache {
    entry: Mutex<Option<CacheEnvelope>>,
}

impl MemoryCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogCache for MemoryCatalogCache {
    fn get(&self) -> Result<Option<String>, CacheError> {
        let entry = self.entry.lock();
        Ok(entry
            .as_ref()
            .filter(|e| !e.is_expired(Utc::now().timestamp()))
            .map(|e| e.snapshot.clone()))
    }

    fn set(&self, snapshot: &str, ttl: Duration) -> Result<(), CacheError> {
        *self.entry.lock() = Some(CacheEnvelope::new(snapshot, ttl));
        Ok(())
    }

    fn delete(&self) -> Result<(), CacheError> {
        *self.entry.lock() = None;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_cache_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCatalogCache::new(dir.path().join("nested").join("cache.json"));

        assert_eq!(cache.get().unwrap(), None);
        cache.set("{\"version\":\"1\"}", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get().unwrap().as_deref(), Some("{\"version\":\"1\"}"));

        cache.delete().unwrap();
        assert_eq!(cache.get().unwrap(), None);
        // Deleting twice is fine
        cache.delete().unwrap();
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCatalogCache::new(dir.path().join("cache.json"));
        cache.set("snapshot", Duration::from_secs(0)).unwrap();
        assert_eq!(cache.get().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"not json").unwrap();
        let cache = FileCatalogCache::new(path);
        assert!(matches!(cache.get(), Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCatalogCache::new();
        cache.set("a", Duration::from_secs(3600)).unwrap();
        assert_eq!(cache.get().unwrap().as_deref(), Some("a"));
        cache.delete().unwrap();
        assert_eq!(cache.get().unwrap(), None);
    }
}
