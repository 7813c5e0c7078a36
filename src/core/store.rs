//! Durable Snapshot Store
//!
//! A small key-value store for whole-state snapshots: each engine persists
//! its complete state as one JSON record under a fixed key after every
//! mutation, and loads it once on start. Writes go through a temp file and
//! an atomic rename so a crash never leaves a half-written snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use thiserror::Error;

/// Unified error type for snapshot store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error for file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store misconfiguration (bad directory, invalid key).
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key-value snapshot storage.
///
/// Implementations must make `save` atomic per key: a reader never observes
/// a partially written snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot stored under `key`, or `None` if absent.
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the snapshot stored under `key`.
    fn save(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;
}

// ============================================================================
// File Store
// ============================================================================

/// File-backed snapshot store: one `<key>.json` per key under a data
/// directory, written via temp file + rename.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(StoreError::config(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory snapshot store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::config("memory store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::config("memory store lock poisoned"))?;
        records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load("campaigns").unwrap().is_none());

        store.save("campaigns", b"{\"campaigns\":[]}").unwrap();
        let loaded = store.load("campaigns").unwrap().unwrap();
        assert_eq!(loaded, b"{\"campaigns\":[]}");
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.load("reputation").unwrap().is_none());
        store.save("reputation", b"{\"currentReputation\":7}").unwrap();

        let loaded = store.load("reputation").unwrap().unwrap();
        assert_eq!(loaded, b"{\"currentReputation\":7}");

        // Overwrite replaces the snapshot whole
        store.save("reputation", b"{\"currentReputation\":9}").unwrap();
        let loaded = store.load("reputation").unwrap().unwrap();
        assert_eq!(loaded, b"{\"currentReputation\":9}");
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.save("../escape", b"{}").is_err());
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_file_store_no_tmp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("campaigns", b"{}").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["campaigns.json".to_string()]);
    }
}
