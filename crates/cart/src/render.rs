//! Markup rendering for cart views.
//!
//! Rendering is a pure function of a [`CartSummary`]: no store access, no
//! storage. Buttons carry `data-action` attributes (`increment`,
//! `decrement`, `remove`, `clear`, `checkout`) that the page script forwards
//! back to the [`CartStore`](crate::CartStore).

use askama::Template;

use crate::error::Outcome;
use crate::model::{CartSummary, LineItem};

/// How long a failure notice stays on screen.
pub const NOTICE_DISMISS_MS: u64 = 3000;

/// Cart line display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub id: String,
    pub title: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub can_increment: bool,
}

impl CartItemView {
    fn from_item(item: &LineItem, max_item_quantity: u32) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price.to_string(),
            line_price: item
                .line_total()
                .map_or_else(|| "-".to_string(), |total| total.to_string()),
            can_increment: item.quantity < max_item_quantity,
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub processing: bool,
}

impl CartView {
    /// Build display data from a summary.
    #[must_use]
    pub fn new(summary: &CartSummary, max_item_quantity: u32, processing: bool) -> Self {
        Self {
            items: summary
                .items
                .iter()
                .map(|item| CartItemView::from_item(item, max_item_quantity))
                .collect(),
            subtotal: summary.total.to_string(),
            item_count: summary.item_count,
            processing,
        }
    }
}

/// Cart items fragment.
#[derive(Template)]
#[template(path = "cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment.
#[derive(Template)]
#[template(path = "cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Auto-dismissing notice fragment.
#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticeTemplate {
    pub level: &'static str,
    pub message: String,
    pub dismiss_after_ms: u64,
}

/// Render the cart items fragment.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_cart(view: CartView) -> askama::Result<String> {
    CartItemsTemplate { cart: view }.render()
}

/// Render the cart count badge.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_count(summary: &CartSummary) -> askama::Result<String> {
    CartCountTemplate {
        count: summary.item_count,
    }
    .render()
}

/// Render a notice for a failed outcome. Successful outcomes render nothing.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_notice<T>(outcome: &Outcome<T>) -> askama::Result<Option<String>> {
    if outcome.success {
        return Ok(None);
    }
    let message = outcome
        .message
        .clone()
        .unwrap_or_else(|| "Something went wrong.".to_string());
    NoticeTemplate {
        level: "error",
        message,
        dismiss_after_ms: NOTICE_DISMISS_MS,
    }
    .render()
    .map(Some)
}
