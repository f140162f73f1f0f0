//! Durable key/value storage backing the client session.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access storage file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode storage file: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// String key/value store. Writes must be durable once they return `Ok`.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Storage that lives as long as the process. Used by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage persisted as a flat JSON object in a single file.
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the storage file at `path`, starting empty when it does not exist.
    ///
    /// An unreadable JSON document is discarded with a warning rather than
    /// locking the user out of the client.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), "Discarding corrupt storage file: {}", err);
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    /// `<data dir>/taskly/storage.json`, if the platform has a data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("taskly").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_can_set_and_remove() {
        let mut storage = MemoryStorage::new();
        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token"), Some("abc".to_string()));

        storage.remove("token").unwrap();
        assert_eq!(storage.get("token"), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set("token", "abc").unwrap();
        storage.set("user", r#"{"id":1}"#).unwrap();
        storage.remove("user").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token"), Some("abc".to_string()));
        assert_eq!(reopened.get("user"), None);
    }

    #[test]
    fn file_storage_starts_empty_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("token"), None);
    }
}
