use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};

/// Storage file name in the data directory
const STORAGE_FILE: &str = "storage.json";

/// Advisory lock file guarding read-modify-write cycles across processes
const LOCK_FILE: &str = "storage.lock";

/// Persistent store backed by a single JSON object on disk.
///
/// The file is re-read on every operation so that separate client processes
/// sharing the same data directory observe each other's writes, the same way
/// browser tabs share one profile's storage. Each operation runs under an
/// exclusive lock on `storage.lock`, and new contents are written to a fresh
/// temp file and renamed into place.
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
    lock_path: PathBuf,
    // Serializes operations within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STORAGE_FILE);
        debug!(?path, "File store opened");
        Ok(Self {
            dir: data_dir.to_path_buf(),
            path,
            lock_path: data_dir.join(LOCK_FILE),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` on the current contents while holding both locks. The
    /// contents are written back only when `op` reports a change.
    fn with_entries<T>(
        &self,
        op: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        lock_file.lock_exclusive()?;

        let mut entries = self.load()?;
        let (result, changed) = op(&mut entries);
        if changed {
            self.save(&entries)?;
        }

        // Dropping the handle releases the lock
        drop(lock_file);
        Ok(result)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                // An unreadable file behaves like cleared storage
                warn!(error = %e, path = ?self.path, "Storage file is corrupt, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        self.with_entries(|entries| {
            let values = keys.iter().map(|key| entries.get(*key).cloned()).collect();
            (values, false)
        })
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            for (key, value) in pairs {
                entries.insert(key.to_string(), value.to_string());
            }
            ((), true)
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            let mut changed = false;
            for key in keys {
                changed |= entries.remove(*key).is_some();
            }
            ((), changed)
        })
    }

    fn take(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entries(|entries| {
            let value = entries.remove(key);
            let changed = value.is_some();
            (value, changed)
        })
    }
}
