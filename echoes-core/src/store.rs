//! Durable storage for the illustration cache.
//!
//! The cache is persisted as one named record holding a JSON array of
//! `[scene description, illustration]` pairs. Storage is best-effort:
//! [`CacheStore`] logs and swallows every failure, so a broken disk
//! degrades to an unpersisted cache rather than a failed turn.

use crate::scene::Illustration;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Name of the record holding the illustration cache.
pub const CACHE_RECORD: &str = "illustration-cache";

/// Scene description to illustration.
pub type IllustrationCache = HashMap<String, Illustration>;

/// Errors from durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A store of named text records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record, `None` when it does not exist.
    async fn read(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Create or replace a record.
    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError>;

    /// Remove a record. Removing an absent record succeeds.
    async fn remove(&self, name: &str) -> Result<(), StorageError>;

    /// Where the record lives on disk, if it survives the process.
    fn location(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Records stored as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileRecords {
    dir: PathBuf,
}

impl FileRecords {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing the named record.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let sanitized = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl RecordStore for FileRecords {
    fn location(&self, name: &str) -> Option<PathBuf> {
        Some(self.path_for(name))
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(name)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(name);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Records kept in memory for the lifetime of the process. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.lock().await.get(name).cloned())
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        self.records
            .lock()
            .await
            .insert(name.to_string(), contents.to_string());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.records.lock().await.remove(name);
        Ok(())
    }
}

/// Loads and saves the illustration cache through a [`RecordStore`].
#[derive(Clone)]
pub struct CacheStore {
    records: Arc<dyn RecordStore>,
    name: String,
}

impl CacheStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            name: CACHE_RECORD.to_string(),
        }
    }

    /// A store that forgets everything when the process exits. For tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRecords::new()))
    }

    /// A store persisting under the given directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileRecords::new(dir)))
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn record_name(&self) -> &str {
        &self.name
    }

    /// The file backing the cache, `None` for a store that does not persist.
    pub fn record_path(&self) -> Option<PathBuf> {
        self.records.location(&self.name)
    }

    /// Load the cache. Missing or malformed data yields an empty cache.
    pub async fn load(&self) -> IllustrationCache {
        match self.try_load().await {
            Ok(cache) => {
                debug!(entries = cache.len(), "Loaded illustration cache");
                cache
            }
            Err(e) => {
                warn!(error = %e, "Failed to load illustration cache, starting empty");
                IllustrationCache::new()
            }
        }
    }

    /// Persist the cache. An empty cache removes the record.
    ///
    /// Failures are logged and swallowed.
    pub async fn save(&self, cache: &IllustrationCache) {
        if let Err(e) = self.try_save(cache).await {
            warn!(error = %e, entries = cache.len(), "Failed to save illustration cache");
        }
    }

    async fn try_load(&self) -> Result<IllustrationCache, StorageError> {
        let Some(contents) = self.records.read(&self.name).await? else {
            return Ok(IllustrationCache::new());
        };
        let pairs: Vec<(String, Illustration)> = serde_json::from_str(&contents)?;
        Ok(pairs.into_iter().collect())
    }

    async fn try_save(&self, cache: &IllustrationCache) -> Result<(), StorageError> {
        if cache.is_empty() {
            return self.records.remove(&self.name).await;
        }
        let pairs: Vec<(&String, &Illustration)> = cache.iter().collect();
        let contents = serde_json::to_string(&pairs)?;
        self.records.write(&self.name, &contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ShapeKind, VectorElement, VectorScene};

    fn sample_cache() -> IllustrationCache {
        let mut cache = IllustrationCache::new();
        cache.insert(
            "A girl at the school gates at dusk".to_string(),
            Illustration::Bitmap("data:image/png;base64,AAAA".to_string()),
        );
        cache.insert(
            "A dark corridor lit by one flickering bulb".to_string(),
            Illustration::Vector(
                VectorScene::new("0 0 100 100", "#0b0b1a").with_element(
                    VectorElement::new(ShapeKind::Rect)
                        .attr("x", 10)
                        .attr("y", 20)
                        .attr("fill", "#333"),
                ),
            ),
        );
        cache
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = CacheStore::in_memory();
        let cache = sample_cache();
        store.save(&cache).await;
        assert_eq!(store.load().await, cache);
    }

    #[tokio::test]
    async fn test_empty_cache_removes_record() {
        let store = CacheStore::in_memory();
        store.save(&sample_cache()).await;
        assert!(store.records().read(CACHE_RECORD).await.unwrap().is_some());

        store.save(&IllustrationCache::new()).await;
        assert!(store.records().read(CACHE_RECORD).await.unwrap().is_none());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_record_loads_empty() {
        let store = CacheStore::in_memory();
        for contents in ["not json", "{\"a\": 1}", "[[\"only-key\"]]", "[1, 2, 3]"] {
            store.records().write(CACHE_RECORD, contents).await.unwrap();
            assert!(store.load().await.is_empty(), "contents: {contents}");
        }
    }

    #[tokio::test]
    async fn test_persisted_format_is_array_of_pairs() {
        let store = CacheStore::in_memory();
        let mut cache = IllustrationCache::new();
        cache.insert("key".to_string(), Illustration::Bitmap("ref".to_string()));
        store.save(&cache).await;

        let contents = store.records().read(CACHE_RECORD).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value, serde_json::json!([["key", "ref"]]));
    }

    #[test]
    fn test_file_record_path() {
        let records = FileRecords::new("/tmp/echoes");
        assert_eq!(
            records.path_for("illustration-cache"),
            PathBuf::from("/tmp/echoes/illustration-cache.json")
        );
        assert_eq!(
            records.path_for("../escape"),
            PathBuf::from("/tmp/echoes/___escape.json")
        );
    }
}
