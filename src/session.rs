//! Session identity
//!
//! The session id is the only piece of client state that survives a restart.
//! It lives in an injected key-value store under a fixed key, is created on
//! first use, and is replaced (never reused) on an explicit reset.

mod store;

pub use store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Storage key holding the current session id
pub const SESSION_KEY: &str = "chat_session_id";

/// Opaque client-generated conversation identifier.
///
/// An empty id is "absent": it is what callers observe when durable storage
/// is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn absent() -> Self {
        Self(String::new())
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owns the durable session id on top of a key-value store
pub struct SessionStore<K: KeyValueStore + ?Sized> {
    storage: Arc<K>,
}

impl<K: KeyValueStore + ?Sized> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<K: KeyValueStore + ?Sized> SessionStore<K> {
    pub fn new(storage: Arc<K>) -> Self {
        Self { storage }
    }

    /// Return the persisted session id, creating and persisting one if none
    /// exists yet.
    ///
    /// Storage failures are not propagated: the caller gets an absent id.
    pub fn get_or_create_session_id(&self) -> SessionId {
        match self.storage.get(SESSION_KEY) {
            Ok(Some(existing)) if !existing.is_empty() => return SessionId::from(existing),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Session storage unreadable, continuing without a session");
                return SessionId::absent();
            }
        }

        let id = SessionId::generate();
        if let Err(e) = self.storage.set(SESSION_KEY, id.as_str()) {
            tracing::warn!(error = %e, "Failed to persist new session id, continuing without a session");
            return SessionId::absent();
        }

        tracing::info!(session_id = %id, "Created new session");
        id
    }

    /// Mint a new session id and persist it in place of the current one.
    ///
    /// The new id is returned even if it could not be persisted; it then only
    /// lasts until the process exits.
    pub fn rotate(&self) -> SessionId {
        let id = SessionId::generate();
        if let Err(e) = self.storage.set(SESSION_KEY, id.as_str()) {
            tracing::warn!(error = %e, session_id = %id, "Failed to persist rotated session id");
        }
        id
    }
}
