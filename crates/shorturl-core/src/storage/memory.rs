use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, StorageError};

/// In-process store scoped to a single run of the client.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.remove(key))
    }
}
