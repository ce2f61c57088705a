//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CART_STORAGE` - `session` (default) or `durable`
//! - `CART_DATA_DIR` - Directory for durable storage (default: `.paperback`)
//! - `CART_MAX_ITEM_QUANTITY` - Per-item quantity cap (default: 10)
//! - `CART_MAX_TOTAL` - Cart total cap (default: 10000)
//! - `CART_ORDER_TIMEOUT_SECS` - Checkout timeout (default: 30)
//! - `CART_CHECKOUT_DELAY_MS` - Simulated gateway delay (default: 1500)

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use paperback_core::Money;
use thiserror::Error;

use crate::storage::{FileStorage, MemoryStorage, Storage};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the cart lives between page loads.
///
/// A deployment picks one. `Session` carts vanish when the session ends;
/// `Durable` carts survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageScope {
    #[default]
    Session,
    Durable,
}

impl FromStr for StorageScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "durable" => Ok(Self::Durable),
            other => Err(format!("expected `session` or `durable`, got `{other}`")),
        }
    }
}

impl std::fmt::Display for StorageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Durable => write!(f, "durable"),
        }
    }
}

/// Limits enforced by the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPolicy {
    /// Most units of a single product a cart may hold.
    pub max_item_quantity: u32,
    /// Highest allowed cart total.
    pub max_cart_total: Money,
    /// How long checkout waits on the order gateway.
    pub order_timeout: Duration,
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self {
            max_item_quantity: 10,
            max_cart_total: Money::from_cents(1_000_000),
            order_timeout: Duration::from_secs(30),
        }
    }
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Storage scope for the cart.
    pub storage: StorageScope,
    /// Directory used by durable storage.
    pub data_dir: PathBuf,
    /// Cart limits.
    pub policy: CartPolicy,
    /// Delay of the simulated order gateway.
    pub checkout_delay: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage: StorageScope::default(),
            data_dir: PathBuf::from(".paperback"),
            policy: CartPolicy::default(),
            checkout_delay: Duration::from_millis(1500),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage = parse_or("CART_STORAGE", &get, defaults.storage)?;
        let data_dir = get("CART_DATA_DIR").map_or(defaults.data_dir, PathBuf::from);

        let max_item_quantity = parse_or(
            "CART_MAX_ITEM_QUANTITY",
            &get,
            defaults.policy.max_item_quantity,
        )?;
        if max_item_quantity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_MAX_ITEM_QUANTITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let max_cart_total = parse_or("CART_MAX_TOTAL", &get, defaults.policy.max_cart_total)?;
        let timeout_secs: u64 = parse_or(
            "CART_ORDER_TIMEOUT_SECS",
            &get,
            defaults.policy.order_timeout.as_secs(),
        )?;
        let delay_ms: u64 = parse_or(
            "CART_CHECKOUT_DELAY_MS",
            &get,
            u64::try_from(defaults.checkout_delay.as_millis()).unwrap_or(u64::MAX),
        )?;

        Ok(Self {
            storage,
            data_dir,
            policy: CartPolicy {
                max_item_quantity,
                max_cart_total,
                order_timeout: Duration::from_secs(timeout_secs),
            },
            checkout_delay: Duration::from_millis(delay_ms),
        })
    }

    /// Open the storage backend for the configured scope.
    #[must_use]
    pub fn open_storage(&self) -> Arc<dyn Storage> {
        match self.storage {
            StorageScope::Session => Arc::new(MemoryStorage::new()),
            StorageScope::Durable => Arc::new(FileStorage::new(&self.data_dir)),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an environment variable, falling back to `default` when unset.
fn parse_or<T>(
    key: &str,
    get: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CartConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CartConfig::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.storage, StorageScope::Session);
        assert_eq!(config.policy.max_item_quantity, 10);
        assert_eq!(config.policy.max_cart_total, Money::from_cents(1_000_000));
        assert_eq!(config.policy.order_timeout, Duration::from_secs(30));
        assert_eq!(config.checkout_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CART_STORAGE", "Durable"),
            ("CART_DATA_DIR", "/var/lib/paperback"),
            ("CART_MAX_ITEM_QUANTITY", "5"),
            ("CART_MAX_TOTAL", "250.50"),
            ("CART_ORDER_TIMEOUT_SECS", "3"),
            ("CART_CHECKOUT_DELAY_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageScope::Durable);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/paperback"));
        assert_eq!(config.policy.max_item_quantity, 5);
        assert_eq!(config.policy.max_cart_total, Money::from_cents(25_050));
        assert_eq!(config.policy.order_timeout, Duration::from_secs(3));
        assert_eq!(config.checkout_delay, Duration::ZERO);
    }

    #[test]
    fn test_invalid_scope() {
        let err = load(&[("CART_STORAGE", "cookie")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CART_STORAGE"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(load(&[("CART_MAX_ITEM_QUANTITY", "ten")]).is_err());
        assert!(load(&[("CART_MAX_ITEM_QUANTITY", "0")]).is_err());
        assert!(load(&[("CART_MAX_TOTAL", "-5")]).is_err());
    }

    #[test]
    fn test_scope_display_roundtrip() {
        for scope in [StorageScope::Session, StorageScope::Durable] {
            assert_eq!(scope.to_string().parse::<StorageScope>().unwrap(), scope);
        }
    }
}
