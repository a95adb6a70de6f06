//! Persisted key-value collaborator
//!
//! Both the user settings and the translation cache live in a small
//! key-value store owned by the embedding host. The pipeline only needs
//! keyed get/put; writes are idempotent overwrites, so no transactional
//! guarantees are required.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{RelayError, Result};

/// Keyed string store. Implementations must tolerate concurrent
/// get/put for the same key (last write wins).
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
}

/// In-memory store, the default when no persistence is configured
#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn KvStore> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn put(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// File-backed store: a JSON object rewritten on every put.
/// Persistence is best effort; a failed write keeps the in-memory
/// view intact and is logged, not surfaced.
pub struct JsonFileKv {
    entries: DashMap<String, String>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileKv {
    /// Open a store at `path`, loading existing entries if the file
    /// is present and parseable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = DashMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let map: BTreeMap<String, String> = serde_json::from_str(&content)
                .map_err(|e| RelayError::Storage(format!("corrupt store file: {}", e)))?;
            for (k, v) in map {
                entries.insert(k, v);
            }
        }

        Ok(Self {
            entries,
            path,
            write_lock: Mutex::new(()),
        })
    }

    fn persist(&self) {
        let _guard = self.write_lock.lock();
        let map: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        match serde_json::to_string_pretty(&map) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!("Failed to persist store to {}: {}", self.path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize store: {}", e),
        }
    }
}

impl KvStore for JsonFileKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn put(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("a"), None);

        kv.put("a", "1".to_string());
        assert_eq!(kv.get("a"), Some("1".to_string()));

        kv.put("a", "2".to_string());
        assert_eq!(kv.get("a"), Some("2".to_string()));
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn test_json_file_kv_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let kv = JsonFileKv::open(&path).unwrap();
            kv.put("translationProvider", "local".to_string());
            kv.put("fontSize", "24".to_string());
        }

        let kv = JsonFileKv::open(&path).unwrap();
        assert_eq!(kv.get("translationProvider"), Some("local".to_string()));
        assert_eq!(kv.get("fontSize"), Some("24".to_string()));
    }

    #[test]
    fn test_json_file_kv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let kv = JsonFileKv::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(kv.get("x"), None);
    }

    #[test]
    fn test_json_file_kv_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileKv::open(&path).is_err());
    }
}
