//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! Cart settings (`CART_*`) are documented on [`CartConfig`]. In addition:
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for structured logs on stderr (default: text)

use paperback_cart::{CartConfig, ConfigError};

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Cart configuration
    pub cart: CartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl CliConfig {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a cart variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cart = CartConfig::from_env()?;
        Ok(Self {
            cart,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            json_logs: get_optional_env("LOG_FORMAT")
                .is_some_and(|format| format.eq_ignore_ascii_case("json")),
        })
    }
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
