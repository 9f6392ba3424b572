use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::credentials::CredentialStore;
use crate::models::UserProfile;
use crate::storage::{KeyValueStore, StorageError};

/// Buffer size for the session event channel.
/// Events are drained after every user command, so a handful is plenty.
const EVENT_BUFFER_SIZE: usize = 16;

/// Changes to the session that other parts of the client react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was established by a successful login
    SignedIn { username: String },
    /// The user signed out explicitly
    SignedOut,
    /// The server rejected the held credential; it has been purged
    Invalidated,
}

/// Why a session is being torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Logout,
    Rejected,
}

/// Shared session context.
///
/// Created once at startup from persisted storage and handed (behind an
/// `Arc`) to the request pipeline and the continuity controller.
pub struct Session {
    credentials: CredentialStore,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Build the session from the persistent store, picking up any
    /// credential left by an earlier run.
    pub fn init(store: Arc<dyn KeyValueStore>) -> Self {
        let credentials = CredentialStore::new(store);
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        match credentials.user() {
            Some(user) => info!(username = %user.username, "Restored saved session"),
            None => debug!("No saved session"),
        }

        Self {
            credentials,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Store a freshly issued credential.
    pub fn establish(&self, token: &str, user: &UserProfile) -> Result<(), StorageError> {
        self.credentials.set(token, user)?;
        info!(username = %user.username, "Session established");
        self.emit(SessionEvent::SignedIn {
            username: user.username.clone(),
        });
        Ok(())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.credentials.user()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.credentials.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// Clear all credential state.
    pub fn teardown(&self, reason: TeardownReason) {
        self.credentials.clear();
        match reason {
            TeardownReason::Logout => {
                info!("Signed out");
                self.emit(SessionEvent::SignedOut);
            }
            TeardownReason::Rejected => {
                warn!("Credential rejected by server, session cleared");
                self.emit(SessionEvent::Invalidated);
            }
        }
    }

    /// Handle a server rejection of `token`.
    ///
    /// Tears the session down only if `token` is still the stored credential.
    /// Returns whether a teardown happened.
    pub fn reject(&self, token: &str) -> bool {
        match self.credentials.token() {
            Some(current) if current == token => {
                self.teardown(TeardownReason::Rejected);
                true
            }
            Some(_) => {
                debug!("Rejected token was already replaced, keeping current session");
                false
            }
            None => {
                debug!("Rejected token was already cleared");
                false
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers just means nobody is listening yet
        if self.events.send(event).is_err() {
            debug!("Session event dropped, no subscribers");
        }
    }
}
