//! One-shot cart commands.

use paperback_cart::{CartError, CartStore, CartSummary, ItemCandidate, Outcome};
use paperback_core::ProductId;

use super::Rejected;
use crate::Format;
use crate::output;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Print the cart.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn show(store: &CartStore, format: Format) -> CommandResult {
    print_summary(store, format, &store.summary())
}

/// Add a book to the cart.
///
/// # Errors
///
/// Returns an error if the id is blank or the store rejects the item.
pub fn add(
    store: &CartStore,
    format: Format,
    id: &str,
    title: String,
    price: f64,
    image: String,
    quantity: Option<i64>,
) -> CommandResult {
    let id = ProductId::parse(id)?;
    let mut candidate = ItemCandidate::new(id, title, price, image);
    candidate.quantity = quantity;
    finish(store, format, store.add_item(candidate))
}

/// Remove a book from the cart.
///
/// # Errors
///
/// Returns an error if the id is blank or the book isn't in the cart.
pub fn remove(store: &CartStore, format: Format, id: &str) -> CommandResult {
    let id = ProductId::parse(id)?;
    finish(store, format, store.remove_item(&id))
}

/// Set the quantity of a book.
///
/// # Errors
///
/// Returns an error if the id is blank or the store rejects the quantity.
pub fn update(store: &CartStore, format: Format, id: &str, quantity: i64) -> CommandResult {
    let id = ProductId::parse(id)?;
    finish(store, format, store.update_quantity(&id, quantity))
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart can't be saved.
pub fn clear(store: &CartStore, format: Format) -> CommandResult {
    finish(store, format, store.clear_cart())
}

/// Place an order for everything in the cart.
///
/// # Errors
///
/// Returns an error if the cart is empty or the order is not confirmed.
pub async fn checkout(store: &CartStore, format: Format) -> CommandResult {
    tracing::info!(items = store.summary().item_count, "Placing order");
    match store.process_order().await {
        Ok(receipt) => {
            tracing::info!(order_id = %receipt.order_id, total = %receipt.total, "Order placed");
            output::print_order(format, &receipt)
        }
        Err(e) => reject(format, &e),
    }
}

/// Print the most recent order, if any.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn last_order(store: &CartStore, format: Format) -> CommandResult {
    match store.last_order() {
        Some(receipt) => output::print_order(format, &receipt),
        None => {
            output::print_no_order(format);
            Ok(())
        }
    }
}

pub(crate) fn print_summary(store: &CartStore, format: Format, summary: &CartSummary) -> CommandResult {
    output::print_cart(
        format,
        summary,
        store.policy().max_item_quantity,
        store.is_processing(),
    )
}

fn finish(store: &CartStore, format: Format, result: Result<CartSummary, CartError>) -> CommandResult {
    match result {
        Ok(summary) => print_summary(store, format, &summary),
        Err(e) => reject(format, &e),
    }
}

/// Print a refused operation and turn it into a [`Rejected`] error.
pub(crate) fn reject(format: Format, error: &CartError) -> CommandResult {
    match error {
        CartError::Storage(_) | CartError::OrderFailed(_) => {
            tracing::error!(error = %error, "Cart operation failed");
        }
        _ => tracing::debug!(error = %error, "Cart operation rejected"),
    }
    output::print_failure(format, &Outcome::<()>::failed(error))?;
    Err(Rejected {
        kind: error.kind(),
        message: error.user_message(),
    }
    .into())
}
