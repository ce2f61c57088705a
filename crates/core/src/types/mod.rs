//! Core types for Paperback.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;

pub use id::{OrderId, ProductId, ProductIdError};
pub use price::{Money, MoneyError};
