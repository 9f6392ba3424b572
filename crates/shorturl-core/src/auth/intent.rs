use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the pending URL
const PENDING_URL_KEY: &str = "pendingUrl";

/// Holds at most one URL the user asked to shorten before signing in.
#[derive(Clone)]
pub struct IntentStore {
    store: Arc<dyn KeyValueStore>,
}

impl IntentStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Record a pending URL, replacing any earlier one.
    pub fn save(&self, url: &str) -> Result<(), StorageError> {
        self.store.set(PENDING_URL_KEY, url)?;
        debug!("Pending intent captured");
        Ok(())
    }

    /// Read and clear the pending URL in one step.
    ///
    /// A second call returns `None` until something is saved again.
    pub fn take_if_present(&self) -> Option<String> {
        match self.store.take(PENDING_URL_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to take pending intent");
                None
            }
        }
    }

    /// Drop any pending URL without reading it.
    pub fn discard(&self) {
        if let Err(e) = self.store.remove(PENDING_URL_KEY) {
            warn!(error = %e, "Failed to discard pending intent");
        }
    }
}
