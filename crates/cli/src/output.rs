//! Printing cart state in the selected format.

#![allow(clippy::print_stdout)]

use paperback_cart::render::{self, CartView};
use paperback_cart::{CartSummary, ErrorKind, OrderReceipt, Outcome};

use crate::Format;

fn emit(text: &str) {
    println!("{text}");
}

/// Plain-text rendering of a cart.
fn cart_text(summary: &CartSummary) -> String {
    if summary.is_empty() {
        return "Your cart is empty.".to_string();
    }
    let mut lines: Vec<String> = summary
        .items
        .iter()
        .map(|item| {
            let line_total = item
                .line_total()
                .map_or_else(|| "-".to_string(), |total| total.to_string());
            format!(
                "{:>4} x {:<32} {:>10}  [{}]",
                item.quantity, item.name, line_total, item.id
            )
        })
        .collect();
    lines.push(format!(
        "{} item(s), total {}",
        summary.item_count, summary.total
    ));
    lines.join("\n")
}

fn order_text(receipt: &OrderReceipt) -> String {
    let units: u32 = receipt.items.iter().map(|item| item.quantity).sum();
    format!(
        "Order {} placed {}: {} item(s), total {}",
        receipt.order_id,
        receipt.date.format("%Y-%m-%d %H:%M:%S UTC"),
        units,
        receipt.total
    )
}

/// Print a cart.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn print_cart(
    format: Format,
    summary: &CartSummary,
    max_item_quantity: u32,
    processing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Text => emit(&cart_text(summary)),
        Format::Json => emit(&serde_json::to_string_pretty(&Outcome::ok(summary))?),
        Format::Html => {
            emit(&render::render_count(summary)?);
            emit(&render::render_cart(CartView::new(
                summary,
                max_item_quantity,
                processing,
            ))?);
        }
    }
    Ok(())
}

/// Print a placed order.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_order(format: Format, receipt: &OrderReceipt) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Text | Format::Html => emit(&order_text(receipt)),
        Format::Json => emit(&serde_json::to_string_pretty(&Outcome::ok(receipt))?),
    }
    Ok(())
}

/// Print "no previous order".
pub fn print_no_order(format: Format) {
    match format {
        Format::Json => emit("null"),
        Format::Text | Format::Html => emit("No orders placed yet."),
    }
}

/// Print a failed outcome.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn print_failure<T>(format: Format, outcome: &Outcome<T>) -> Result<(), Box<dyn std::error::Error>>
where
    T: serde::Serialize,
{
    match format {
        Format::Json => emit(&serde_json::to_string_pretty(outcome)?),
        Format::Html => {
            if let Some(html) = render::render_notice(outcome)? {
                emit(&html);
            }
        }
        Format::Text => {
            let kind = outcome.error.map_or("error", kind_label);
            let message = outcome.message.as_deref().unwrap_or("Something went wrong.");
            emit(&format!("{kind}: {message}"));
        }
    }
    Ok(())
}

const fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "invalid",
        ErrorKind::LimitExceeded => "limit",
        ErrorKind::NotFound => "not found",
        ErrorKind::AlreadyProcessing | ErrorKind::OrderInProgress => "busy",
        ErrorKind::EmptyCart => "empty",
        ErrorKind::OrderFailed => "order failed",
        ErrorKind::Storage => "storage",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use paperback_cart::LineItem;
    use paperback_core::{Money, ProductId};

    use super::*;

    #[test]
    fn test_cart_text_lists_items_and_total() {
        let summary = CartSummary::from_items(
            vec![LineItem {
                id: ProductId::from("b1"),
                name: "Dune".to_string(),
                price: Money::from_cents(999),
                image: "/d.jpg".to_string(),
                quantity: 2,
            }],
            Utc::now(),
        );
        let text = cart_text(&summary);
        assert!(text.contains("Dune"));
        assert!(text.contains("$19.98"));
        assert!(text.ends_with("2 item(s), total $19.98"));
    }

    #[test]
    fn test_cart_text_empty() {
        let summary = CartSummary::from_items(Vec::new(), Utc::now());
        assert_eq!(cart_text(&summary), "Your cart is empty.");
    }
}
