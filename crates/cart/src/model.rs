//! Cart data types: line items, add-to-cart candidates, summaries, and orders.

use chrono::{DateTime, Utc};
use paperback_core::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::CartError;

/// One distinct product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Display title.
    #[serde(alias = "title")]
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Image URL.
    pub image: String,
    /// Units in the cart, always at least 1.
    pub quantity: u32,
}

impl LineItem {
    /// `price × quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Money> {
        self.price.times(self.quantity)
    }
}

/// Sum of line totals, or `None` on overflow.
pub(crate) fn total_of(items: &[LineItem]) -> Option<Money> {
    items
        .iter()
        .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total()?))
}

/// An item offered for adding to the cart.
///
/// Every field is optional so that malformed input from a form or a JSON
/// payload can be reported as a validation failure rather than a decode
/// error. `title` is accepted in place of `name`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemCandidate {
    pub id: Option<ProductId>,
    #[serde(alias = "title")]
    pub name: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub quantity: Option<i64>,
}

impl ItemCandidate {
    /// Create a candidate with every required field set and no quantity.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: f64,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            price: Some(price),
            image: Some(image.into()),
            quantity: None,
        }
    }

    /// Set the requested quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Decode a candidate from an untyped JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Validation`] if a field has the wrong type.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CartError> {
        serde_json::from_value(value).map_err(|e| CartError::Validation(e.to_string()))
    }

    /// Check required fields and return a validated candidate.
    pub(crate) fn validate(self) -> Result<ValidCandidate, CartError> {
        let id = self
            .id
            .map(ProductId::canonical)
            .filter(|id| !id.is_blank())
            .ok_or_else(|| CartError::Validation("missing id".to_string()))?;

        let name = self
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CartError::Validation("missing name".to_string()))?;

        let raw_price = self
            .price
            .ok_or_else(|| CartError::Validation("missing price".to_string()))?;
        if !raw_price.is_finite() || raw_price <= 0.0 {
            return Err(CartError::Validation(format!(
                "price must be a positive number (got {raw_price})"
            )));
        }
        let price = Money::try_from(raw_price)
            .map_err(|e| CartError::Validation(format!("invalid price: {e}")))?;
        if price.is_zero() {
            return Err(CartError::Validation(format!(
                "price rounds to zero (got {raw_price})"
            )));
        }

        let image = self
            .image
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| CartError::Validation("missing image".to_string()))?;

        Ok(ValidCandidate {
            id,
            name,
            price,
            image,
            quantity: self.quantity.unwrap_or(1),
        })
    }
}

/// A candidate whose required fields are present and well-formed.
///
/// The quantity is still raw: merging and inserting sanitize it differently.
#[derive(Debug, Clone)]
pub(crate) struct ValidCandidate {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image: String,
    pub quantity: i64,
}

/// Persisted form of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRecord {
    pub items: Vec<LineItem>,
    pub last_updated: DateTime<Utc>,
}

/// Read-only view of the cart for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Line items in insertion order.
    pub items: Vec<LineItem>,
    /// Sum of quantities.
    pub item_count: u32,
    /// Sum of line totals.
    pub total: Money,
    /// When the cart last changed.
    pub last_updated: DateTime<Utc>,
}

impl CartSummary {
    /// Build a summary from items.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>, last_updated: DateTime<Utc>) -> Self {
        let item_count = items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity));
        let total = total_of(&items).unwrap_or(Money::ZERO);
        Self {
            items,
            item_count,
            total,
            last_updated,
        }
    }

    /// Returns `true` if the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line item by id.
    #[must_use]
    pub fn item(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}

/// A cart snapshot handed to the order gateway for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub placed_at: DateTime<Utc>,
}

/// A confirmed order, as persisted under the last-order key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub date: DateTime<Utc>,
}

impl From<PendingOrder> for OrderReceipt {
    fn from(order: PendingOrder) -> Self {
        Self {
            order_id: order.order_id,
            items: order.items,
            total: order.total,
            date: order.placed_at,
        }
    }
}
