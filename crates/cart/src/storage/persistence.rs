//! Typed JSON access over a [`Storage`] backend.
//!
//! Reads never fail: a missing key, an unreadable backend, and a malformed
//! value all come back as `None`, with the latter two logged.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{Storage, StorageError};

/// Stored shape of a value written with an expiry.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// JSON persistence over a shared storage backend.
#[derive(Debug, Clone)]
pub struct Persistence {
    backend: Arc<dyn Storage>,
}

impl Persistence {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend }
    }

    /// Read and decode `key`.
    ///
    /// Returns `None` if the key is absent, the backend fails, or the stored
    /// value does not decode as `T`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Storage read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value is corrupt, treating as absent");
                None
            }
        }
    }

    /// Encode and write `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the backend cannot be written.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.backend.set(key, &raw)
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove(key)
    }

    /// Write `value` so that reads after `ttl` has elapsed see nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the backend cannot be written.
    pub fn set_with_expiry<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: TimeDelta,
    ) -> Result<(), StorageError> {
        let record = Expiring {
            value,
            expires_at: Utc::now() + ttl,
        };
        self.set(key, &record)
    }

    /// Read a value written by [`set_with_expiry`](Self::set_with_expiry).
    ///
    /// An expired record is removed and reported as absent.
    #[must_use]
    pub fn get_with_expiry<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_with_expiry_at(key, Utc::now())
    }

    fn get_with_expiry_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let record: Expiring<T> = self.get(key)?;
        if now >= record.expires_at {
            debug!(key, expired_at = %record.expires_at, "Stored value expired");
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to remove expired value");
            }
            return None;
        }
        Some(record.value)
    }
}
