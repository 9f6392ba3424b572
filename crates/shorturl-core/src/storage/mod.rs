//! Key-value storage collaborators.
//!
//! Two scopes back the session engine:
//! - `FileStore`: persistent, profile-scoped storage that survives restarts
//!   (holds the credential and user profile)
//! - `MemoryStore`: ephemeral, tab-scoped storage that lives as long as the
//!   process (holds the pending intent)
//!
//! Both implement `KeyValueStore`, so the credential and intent stores can be
//! tested against either.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode storage contents: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Failed to replace storage file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// String key-value interface shared by the persistent and ephemeral scopes.
///
/// The `*_many` operations apply to all given keys as one unit: no other
/// caller, in this process or another one sharing the backing file, can
/// observe some of the keys updated and others not.
pub trait KeyValueStore: Send + Sync {
    /// Values for `keys`, in the same order.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError>;

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove keys. Missing keys are not an error.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;

    /// Read and remove a key as a single operation.
    ///
    /// Implementations must hold their lock across both halves so no other
    /// caller can observe the value between the read and the removal.
    fn take(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_many(&[key])
    }
}
