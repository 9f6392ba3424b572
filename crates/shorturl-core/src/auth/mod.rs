//! Authentication state for the client.
//!
//! This module provides:
//! - `CredentialStore`: the bearer token and user profile, persisted as one unit
//! - `IntentStore`: the single pending "shorten this URL" intent awaiting login
//! - `Session`: the shared session context handed to the request pipeline and
//!   the continuity controller, with a broadcast channel for session events

pub mod credentials;
pub mod intent;
pub mod session;

pub use credentials::{Credential, CredentialStore};
pub use intent::IntentStore;
pub use session::{Session, SessionEvent, TeardownReason};
