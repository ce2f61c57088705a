//! Cart error taxonomy and the structured outcome shown to the presentation layer.
//!
//! Every cart operation returns `Result<T, CartError>`. None of these are
//! fatal: the cart is left exactly as it was, and the caller turns the error
//! into a user-facing notice via [`Outcome`].

use std::fmt;

use paperback_core::{Money, ProductId};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Which policy limit an operation would have violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Limit {
    /// A line item would hold more than the per-item maximum.
    ItemQuantity { max: u32, requested: u64 },
    /// The cart total would exceed the maximum.
    CartTotal { max: Money, attempted: Option<Money> },
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemQuantity { max, requested } => {
                write!(f, "at most {max} of each item allowed (requested {requested})")
            }
            Self::CartTotal {
                max,
                attempted: Some(attempted),
            } => write!(f, "cart total cannot exceed {max} (would be {attempted})"),
            Self::CartTotal {
                max,
                attempted: None,
            } => write!(f, "cart total cannot exceed {max}"),
        }
    }
}

/// Errors reported by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The candidate item is malformed, or a quantity is out of range.
    #[error("Invalid item: {0}")]
    Validation(String),

    /// A quantity or total cap would be exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(Limit),

    /// No line item with this id.
    #[error("Item not found: {0}")]
    NotFound(ProductId),

    /// `process_order` called while an order is in flight.
    #[error("An order is already being processed")]
    AlreadyProcessing,

    /// Checkout with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A mutation attempted while an order is in flight.
    #[error("Cart cannot change while an order is in progress")]
    OrderInProgress,

    /// The order gateway declined, failed, or timed out.
    #[error("Order failed: {0}")]
    OrderFailed(#[source] GatewayError),

    /// Writing cart state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    LimitExceeded,
    NotFound,
    AlreadyProcessing,
    EmptyCart,
    OrderInProgress,
    OrderFailed,
    Storage,
}

impl CartError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::LimitExceeded(_) => ErrorKind::LimitExceeded,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyProcessing => ErrorKind::AlreadyProcessing,
            Self::EmptyCart => ErrorKind::EmptyCart,
            Self::OrderInProgress => ErrorKind::OrderInProgress,
            Self::OrderFailed(_) => ErrorKind::OrderFailed,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message safe to show to a shopper.
    ///
    /// Storage and gateway details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Your cart could not be saved. Please try again.".to_string(),
            Self::OrderFailed(_) => {
                "We couldn't complete your order. Your cart has been kept.".to_string()
            }
            Self::NotFound(_) => "That item is no longer in your cart.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Structured result of a cart operation, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    /// A successful outcome carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            data: Some(data),
        }
    }

    /// A failed outcome describing `error`.
    #[must_use]
    pub fn failed(error: &CartError) -> Self {
        Self {
            success: false,
            error: Some(error.kind()),
            message: Some(error.user_message()),
            data: None,
        }
    }
}

impl<T> From<Result<T, CartError>> for Outcome<T> {
    fn from(result: Result<T, CartError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(&e),
        }
    }
}
