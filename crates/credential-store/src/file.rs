//! JSON-file backend.
//!
//! The whole map lives in memory and is written through on every mutation
//! via a temp file + rename, so a crash never leaves a half-written file.
//! The in-memory map only changes once the write has landed.

use crate::{CredentialStore, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistent store backed by a single JSON object on disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    StorageError::Encoding(format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened credential file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        store.set("token", "abc").unwrap();
        store.set("theme", "light").unwrap();
        drop(store);

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_delete_is_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        store.set("token", "abc").unwrap();
        assert!(store.delete("token").unwrap());
        assert!(!store.delete("token").unwrap());

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert!(reopened.get("token").unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get("token").unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = FileCredentialStore::open(&path);
        assert!(matches!(result, Err(StorageError::Encoding(_))));
    }

    #[test]
    fn test_failed_write_leaves_value_unset() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("afile");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = FileCredentialStore::open(blocker.join("credentials.json")).unwrap();
        assert!(store.set("token", "abc").is_err());
        assert!(store.get("token").unwrap().is_none());
        assert!(!store.has("token").unwrap());
    }

    #[test]
    fn test_failed_delete_keeps_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        store.set("token", "abc").unwrap();

        // A directory in place of the file makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.delete("token").is_err());
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
    }
}
