use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::UserProfile;
use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the bearer token
const TOKEN_KEY: &str = "token";

/// Storage key for the JSON-encoded user profile
const USER_KEY: &str = "user";

/// A bearer token together with the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub user: UserProfile,
}

/// Persistent home of the current credential.
///
/// Token and profile are only ever observed together: a token without a
/// readable profile (or the reverse) reads as no credential at all.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a token and profile in one write.
    pub fn set(&self, token: &str, user: &UserProfile) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(user)?;
        self.store.set_many(&[(TOKEN_KEY, token), (USER_KEY, &encoded)])?;
        debug!(user_id = user.id, "Credential stored");
        Ok(())
    }

    /// The stored credential, or `None` when absent, partial or unreadable.
    pub fn get(&self) -> Option<Credential> {
        let mut values = match self.store.get_many(&[TOKEN_KEY, USER_KEY]) {
            Ok(values) => values.into_iter(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                return None;
            }
        };
        let token = values.next().flatten();
        let encoded = values.next().flatten();

        let (token, encoded) = match (token, encoded) {
            (Some(token), Some(encoded)) if !token.is_empty() => (token, encoded),
            (Some(_), None) => {
                debug!("Token present without profile, treating as signed out");
                return None;
            }
            _ => return None,
        };

        match serde_json::from_str::<UserProfile>(&encoded) {
            Ok(user) => Some(Credential { token, user }),
            Err(e) => {
                warn!(error = %e, "Stored profile is corrupt, treating as signed out");
                None
            }
        }
    }

    /// Remove both halves of the credential. Safe to call when nothing is stored.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove_many(&[TOKEN_KEY, USER_KEY]) {
            warn!(error = %e, "Failed to remove credential");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.get().map(|c| c.token)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.get().map(|c| c.user)
    }
}
