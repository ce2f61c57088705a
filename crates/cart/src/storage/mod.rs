//! Key-value storage backends for cart state.
//!
//! [`Storage`] is the raw string-in, string-out seam, shaped after browser
//! `localStorage`/`sessionStorage`. [`Persistence`] layers typed JSON access
//! and expiring records on top of any backend.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - session scope; contents die with the process
//! - [`FileStorage`] - durable scope; one JSON file per key

use std::fmt;

mod file;
mod memory;
mod persistence;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persistence::Persistence;

/// Storage keys used by the cart.
pub mod keys {
    /// Key for the persisted cart record.
    pub const CART: &str = "cart";

    /// Key for the most recently placed order.
    pub const LAST_ORDER: &str = "lastOrder";
}

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Reading or writing the backend failed.
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded for storage.
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key-value store.
///
/// All methods take `&self`; implementations use interior mutability.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Read a value. Returns `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Notification that a key was changed by someone other than this store.
///
/// Carries no payload: receivers re-read the key in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed.
    pub key: String,
}

impl StorageEvent {
    /// Create an event for `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Returns `true` if the event concerns `key`.
    #[must_use]
    pub fn is_for(&self, key: &str) -> bool {
        self.key == key
    }
}
