//! Whole-document persistence.
//!
//! A [`KeyValueStore`] holds opaque strings under keys. [`StateStore`] layers
//! the document contract on top: `read` always yields a usable [`Document`]
//! (malformed or absent content becomes the empty document), and `write`
//! replaces the stored document wholesale. There is no partial update, no
//! version check and no lock. Concurrent read-modify-write cycles from
//! different contexts race and the last write wins.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::io;

use tracing::warn;

use crate::bus::ChangeEvent;
use crate::error::LobbyError;
use crate::state::Document;

/// Failure of the underlying key/value backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// Description of the failure.
    pub reason: String,
}

impl StoreError {
    /// Create a new store error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.reason)
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<StoreError> for LobbyError {
    fn from(e: StoreError) -> Self {
        LobbyError::Storage(e.reason)
    }
}

/// Read/write one blob per key.
pub trait KeyValueStore: Send + Sync {
    /// The value under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// The shared document held under one key of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> StateStore<S> {
    /// Wrap `backend`, storing the document under `key`.
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Storage key of the document.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// The raw stored text, `None` if absent or unreadable.
    #[must_use]
    pub fn read_raw(&self) -> Option<String> {
        match self.backend.get(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read shared document");
                None
            }
        }
    }

    /// The current document, or the empty document if none is stored or the
    /// stored text does not parse.
    #[must_use]
    pub fn read(&self) -> Document {
        let Some(raw) = self.read_raw() else {
            return Document::default();
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored document is malformed; using empty document");
                Document::default()
            }
        }
    }

    /// Stamp `last_updated` and replace the stored document.
    ///
    /// Returns the change notification describing the write.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn write(&self, doc: &mut Document, now: u64) -> Result<ChangeEvent, LobbyError> {
        doc.last_updated = Some(now);
        let new_value =
            serde_json::to_string(doc).map_err(|e| LobbyError::Storage(e.to_string()))?;
        let old_value = self.read_raw();
        self.backend.set(&self.key, &new_value)?;
        Ok(ChangeEvent {
            key: self.key.clone(),
            new_value: Some(new_value),
            old_value,
        })
    }
}
