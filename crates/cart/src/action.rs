//! User actions forwarded from a cart view.
//!
//! Each variant matches a `data-action` attribute in the rendered markup.

use std::str::FromStr;

use paperback_core::ProductId;
use serde::Serialize;

use crate::error::CartError;
use crate::gateway::OrderGateway;
use crate::model::{CartSummary, OrderReceipt};
use crate::store::CartStore;

/// A button press in the cart view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Increment(ProductId),
    Decrement(ProductId),
    Remove(ProductId),
    Clear,
    Checkout,
}

/// Errors parsing a [`CartAction`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    #[error("unknown action: {0}")]
    Unknown(String),
    #[error("action {0} needs a product id")]
    MissingId(String),
}

impl CartAction {
    /// Build an action from a `data-action` name and optional `data-id`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, or item actions without an id.
    pub fn parse(name: &str, id: Option<&str>) -> Result<Self, ActionParseError> {
        let require_id = || {
            id.and_then(|raw| ProductId::parse(raw).ok())
                .ok_or_else(|| ActionParseError::MissingId(name.to_owned()))
        };
        match name {
            "increment" => Ok(Self::Increment(require_id()?)),
            "decrement" => Ok(Self::Decrement(require_id()?)),
            "remove" => Ok(Self::Remove(require_id()?)),
            "clear" => Ok(Self::Clear),
            "checkout" => Ok(Self::Checkout),
            other => Err(ActionParseError::Unknown(other.to_owned())),
        }
    }
}

impl FromStr for CartAction {
    type Err = ActionParseError;

    /// Parse `"<action>"` or `"<action>:<id>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, id)) => Self::parse(name.trim(), Some(id)),
            None => Self::parse(s.trim(), None),
        }
    }
}

/// What an action produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionResult {
    Cart(CartSummary),
    Order(OrderReceipt),
}

impl<G: OrderGateway> CartStore<G> {
    /// Apply a view action.
    ///
    /// Increment and decrement step the current quantity by one; decrementing
    /// the last unit removes the line.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying operation reports.
    pub async fn apply(&self, action: CartAction) -> Result<ActionResult, CartError> {
        let summary = match action {
            CartAction::Increment(id) => {
                let quantity = self.current_quantity(&id)?;
                self.update_quantity(&id, quantity + 1)?
            }
            CartAction::Decrement(id) => {
                let quantity = self.current_quantity(&id)?;
                self.update_quantity(&id, quantity - 1)?
            }
            CartAction::Remove(id) => self.remove_item(&id)?,
            CartAction::Clear => self.clear_cart()?,
            CartAction::Checkout => return self.process_order().await.map(ActionResult::Order),
        };
        Ok(ActionResult::Cart(summary))
    }

    fn current_quantity(&self, id: &ProductId) -> Result<i64, CartError> {
        self.summary()
            .item(id)
            .map(|item| i64::from(item.quantity))
            .ok_or_else(|| CartError::NotFound(id.clone()))
    }
}
