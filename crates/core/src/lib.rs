//! Paperback Core - Shared types library.
//!
//! This crate provides common types used across all Paperback components:
//! - `cart` - Cart state, persistence, and rendering
//! - `cli` - Command-line front end for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe product and order IDs, and decimal money amounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
