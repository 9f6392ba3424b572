//! Core library for the ShortURL client.
//!
//! The interesting part is the session engine:
//! - `storage`: persistent and ephemeral key-value collaborators
//! - `auth`: credential store, pending-intent store and the shared `Session`
//! - `api`: the request pipeline (token injection, teardown on rejection)
//!   and the typed endpoints built on it
//! - `controller`: the continuity controller that parks a signed-out
//!   shorten request and resumes it after login
//!
//! `models`, `config` and `utils` support those.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod models;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError, RequestPipeline};
pub use auth::{Credential, CredentialStore, IntentStore, Session, SessionEvent, TeardownReason};
pub use config::Config;
pub use controller::{FlowError, FlowState, Route, Router, SessionController, SubmitOutcome};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
