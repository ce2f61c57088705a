//! Paperback Cart - Shopping cart state for the bookstore.
//!
//! # Architecture
//!
//! - [`storage`] - Key-value backends and typed JSON persistence
//! - [`store`] - [`CartStore`], the cart state machine
//! - [`gateway`] - Order confirmation seam used at checkout
//! - [`action`] - View actions (`increment`, `checkout`, ...) mapped onto the store
//! - [`render`] - Askama fragments built from a [`CartSummary`]
//! - [`config`] - Environment-driven configuration and limits
//!
//! A store is constructed explicitly and passed to whatever renders it;
//! there is no global cart.
//!
//! ```no_run
//! use paperback_cart::{CartConfig, CartStore, ItemCandidate, Persistence, SimulatedGateway};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartConfig::from_env()?;
//! let store = CartStore::load(
//!     Persistence::new(config.open_storage()),
//!     SimulatedGateway::new(config.checkout_delay),
//!     config.policy.clone(),
//! );
//! let summary = store.add_item(ItemCandidate::new("b1", "Dune", 9.99, "/img/dune.jpg"))?;
//! assert_eq!(summary.item_count, 1);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod action;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod render;
pub mod storage;
pub mod store;

pub use action::{ActionParseError, ActionResult, CartAction};
pub use config::{CartConfig, CartPolicy, ConfigError, StorageScope};
pub use error::{CartError, ErrorKind, Limit, Outcome};
pub use gateway::{GatewayError, OrderGateway, SimulatedGateway};
pub use model::{CartRecord, CartSummary, ItemCandidate, LineItem, OrderReceipt, PendingOrder};
pub use storage::{FileStorage, MemoryStorage, Persistence, Storage, StorageError, StorageEvent};
pub use store::{CartEvent, CartStore, OrderPhase};
