//! Integration tests for the Paperback cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p paperback-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - Cart operations, limits, and persistence round trips
//! - `checkout` - Order placement, re-entrancy, and gateway failures
//!
//! This crate's library holds the fixtures those tests share: a storage
//! backend that counts writes, and gateways that fail or stall.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use paperback_cart::{
    CartPolicy, CartStore, GatewayError, ItemCandidate, MemoryStorage, OrderGateway, Persistence,
    PendingOrder, SimulatedGateway, Storage, StorageError,
};
use paperback_core::ProductId;

/// Memory storage that counts `set` and `remove` calls per key.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    writes: Mutex<HashMap<String, usize>>,
}

impl RecordingStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes (sets and removes) made to `key`.
    #[must_use]
    pub fn writes(&self, key: &str) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Total writes across all keys.
    #[must_use]
    pub fn total_writes(&self) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn record(&self, key: &str) {
        *self
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_owned())
            .or_default() += 1;
    }
}

impl Storage for RecordingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.record(key);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.record(key);
        self.inner.remove(key)
    }
}

/// Storage whose writes always fail.
#[derive(Debug, Default)]
pub struct ReadOnlyStorage {
    inner: MemoryStorage,
}

impl ReadOnlyStorage {
    /// Storage pre-seeded with `key = value`.
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails.
    pub fn seeded(key: &str, value: &str) -> Result<Self, StorageError> {
        let inner = MemoryStorage::new();
        inner.set(key, value)?;
        Ok(Self { inner })
    }
}

impl Storage for ReadOnlyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io {
            key: key.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.set(key, "")
    }
}

/// Memory storage that can be told to start failing writes to one key.
#[derive(Debug, Default)]
pub struct FaultyKeyStorage {
    inner: MemoryStorage,
    failing: Mutex<Option<String>>,
}

impl FaultyKeyStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write to `key` fail.
    pub fn fail_writes_to(&self, key: &str) {
        *self.failing.lock().unwrap_or_else(PoisonError::into_inner) = Some(key.to_owned());
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.as_deref() == Some(key) {
            return Err(StorageError::Io {
                key: key.to_owned(),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

impl Storage for FaultyKeyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.remove(key)
    }
}

/// Gateway that declines every order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecliningGateway;

impl OrderGateway for DecliningGateway {
    async fn confirm(&self, _order: &PendingOrder) -> Result<(), GatewayError> {
        Err(GatewayError::Declined("card declined".to_owned()))
    }
}

/// Gateway that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledGateway;

impl OrderGateway for StalledGateway {
    async fn confirm(&self, _order: &PendingOrder) -> Result<(), GatewayError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Store over `backend` with default limits and a gateway that answers
/// after `delay`.
#[must_use]
pub fn store_with(backend: Arc<dyn Storage>, delay: Duration) -> CartStore {
    CartStore::load(
        Persistence::new(backend),
        SimulatedGateway::new(delay),
        CartPolicy::default(),
    )
}

/// A valid book candidate.
#[must_use]
pub fn book(id: impl Into<ProductId>, price: f64) -> ItemCandidate {
    let id = id.into();
    ItemCandidate::new(id.clone(), format!("Book {id}"), price, format!("/covers/{id}.jpg"))
}
