//! Durable key-value storage for the session.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionStore` is the only caller. Backends mirror the browser's
//! `localStorage` contract (string keys, string values, synchronous) so the
//! same session logic runs natively against a directory and in the browser
//! against `window.localStorage`.

pub mod file;
pub mod session;

#[cfg(feature = "hydrate")]
pub mod browser;


use std::collections::HashMap;
use std::sync::Mutex;

pub use file::FileStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No durable storage exists in this execution context.
    #[error("storage unavailable")]
    Unavailable,
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("value encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// Backend-specific failure (quota exceeded, access denied, poisoned lock).
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Synchronous string key-value store.
pub trait Storage: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError`] if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage; durable only for the life of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> R,
    ) -> Result<R, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".to_owned()))?;
        Ok(f(&mut entries))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}
