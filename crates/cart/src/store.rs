//! The cart state manager.
//!
//! [`CartStore`] is the single in-memory authority for one shopper's cart.
//! It is built once per session with [`CartStore::load`], writes through to
//! [`Persistence`] on every mutation, and hands out [`CartSummary`] snapshots
//! for rendering.
//!
//! # Checkout
//!
//! [`CartStore::process_order`] is the only operation that suspends. While
//! it waits on the [`OrderGateway`] the store is in [`OrderPhase::Processing`]:
//! a second checkout gets [`CartError::AlreadyProcessing`] and every mutation
//! gets [`CartError::OrderInProgress`]. The order snapshot is taken before the
//! suspension, so the cart that is cleared is the cart that was ordered.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use paperback_core::{Money, OrderId, ProductId};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CartPolicy;
use crate::error::{CartError, Limit};
use crate::gateway::{GatewayError, OrderGateway, SimulatedGateway};
use crate::model::{
    CartRecord, CartSummary, ItemCandidate, LineItem, OrderReceipt, PendingOrder, total_of,
};
use crate::storage::{Persistence, StorageEvent, keys};

const EVENT_CAPACITY: usize = 16;

/// Whether an order is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPhase {
    #[default]
    Idle,
    Processing,
}

/// Change notifications for views of the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The cart was changed by this store.
    Updated(CartSummary),
    /// The cart was re-read from storage after an external change.
    Reloaded(CartSummary),
    /// An order was confirmed and the cart cleared.
    OrderPlaced(OrderId),
}

#[derive(Debug)]
struct CartState {
    items: Vec<LineItem>,
    last_updated: DateTime<Utc>,
    phase: OrderPhase,
}

impl CartState {
    fn summary(&self) -> CartSummary {
        CartSummary::from_items(self.items.clone(), self.last_updated)
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

/// Resets the phase to idle when checkout ends, however it ends.
struct ProcessingGuard<'a> {
    state: &'a Mutex<CartState>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = OrderPhase::Idle;
    }
}

/// Cart state manager for one session.
#[derive(Debug)]
pub struct CartStore<G = SimulatedGateway> {
    persistence: Persistence,
    gateway: G,
    policy: CartPolicy,
    state: Mutex<CartState>,
    events: broadcast::Sender<CartEvent>,
}

impl<G: OrderGateway> CartStore<G> {
    /// Build a store from whatever cart is persisted.
    ///
    /// A missing or corrupt record yields an empty cart.
    pub fn load(persistence: Persistence, gateway: G, policy: CartPolicy) -> Self {
        let (items, last_updated) = read_cart(&persistence);
        info!(items = items.len(), "Loaded cart");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            persistence,
            gateway,
            policy,
            state: Mutex::new(CartState {
                items,
                last_updated,
                phase: OrderPhase::Idle,
            }),
            events,
        }
    }

    /// The limits this store enforces.
    #[must_use]
    pub const fn policy(&self) -> &CartPolicy {
        &self.policy
    }

    /// Current checkout phase.
    #[must_use]
    pub fn phase(&self) -> OrderPhase {
        self.lock().phase
    }

    /// Returns `true` while an order is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.phase() == OrderPhase::Processing
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current cart. Performs no I/O.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.lock().summary()
    }

    /// Add an item, merging with an existing line of the same id.
    ///
    /// # Errors
    ///
    /// - [`CartError::Validation`] if the candidate is malformed
    /// - [`CartError::LimitExceeded`] if a merge would exceed the per-item cap,
    ///   or the result would exceed the cart total cap
    /// - [`CartError::OrderInProgress`] during checkout
    /// - [`CartError::Storage`] if the cart cannot be saved
    #[instrument(skip(self, candidate), fields(id = ?candidate.id))]
    pub fn add_item(&self, candidate: ItemCandidate) -> Result<CartSummary, CartError> {
        let candidate = candidate.validate().inspect_err(|e| {
            debug!(error = %e, "Rejected add-to-cart candidate");
        })?;

        let mut state = self.lock_idle()?;
        let max = self.policy.max_item_quantity;
        let mut items = state.items.clone();

        match state.position(&candidate.id).and_then(|i| items.get_mut(i)) {
            Some(existing) => {
                let added = u64::try_from(candidate.quantity.max(1)).unwrap_or(u64::MAX);
                let combined = u64::from(existing.quantity).saturating_add(added);
                if combined > u64::from(max) {
                    return Err(CartError::LimitExceeded(Limit::ItemQuantity {
                        max,
                        requested: combined,
                    }));
                }
                existing.quantity = u32::try_from(combined).unwrap_or(max);
            }
            None => {
                let quantity = clamp_quantity(candidate.quantity, max);
                if i64::from(quantity) != candidate.quantity {
                    debug!(
                        requested = candidate.quantity,
                        quantity, "Clamped quantity for new item"
                    );
                }
                items.push(LineItem {
                    id: candidate.id,
                    name: candidate.name,
                    price: candidate.price,
                    image: candidate.image,
                    quantity,
                });
            }
        }

        self.check_total(&items)?;
        let summary = self.commit(&mut state, items)?;
        info!(
            item_count = summary.item_count,
            total = %summary.total,
            "Added item to cart"
        );
        Ok(summary)
    }

    /// Remove the line item with `id`.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if no such item; the cart is unchanged
    /// - [`CartError::OrderInProgress`] during checkout
    /// - [`CartError::Storage`] if the cart cannot be saved
    #[instrument(skip(self))]
    pub fn remove_item(&self, id: &ProductId) -> Result<CartSummary, CartError> {
        let mut state = self.lock_idle()?;
        let Some(index) = state.position(id) else {
            debug!("Remove target not in cart");
            return Err(CartError::NotFound(id.clone()));
        };

        let mut items = state.items.clone();
        items.remove(index);
        let summary = self.commit(&mut state, items)?;
        info!(item_count = summary.item_count, "Removed item from cart");
        Ok(summary)
    }

    /// Set the quantity of the line item with `id`. Zero removes it.
    ///
    /// # Errors
    ///
    /// - [`CartError::Validation`] if `quantity` is negative
    /// - [`CartError::NotFound`] if no such item
    /// - [`CartError::LimitExceeded`] if `quantity` is above the per-item cap,
    ///   or the new total would exceed the cart total cap
    /// - [`CartError::OrderInProgress`] during checkout
    /// - [`CartError::Storage`] if the cart cannot be saved
    #[instrument(skip(self))]
    pub fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<CartSummary, CartError> {
        let max = self.policy.max_item_quantity;
        let Ok(requested) = u64::try_from(quantity) else {
            return Err(CartError::Validation(format!(
                "quantity must be between 0 and {max}"
            )));
        };
        let quantity = u32::try_from(requested)
            .ok()
            .filter(|q| *q <= max)
            .ok_or(CartError::LimitExceeded(Limit::ItemQuantity { max, requested }))?;

        if quantity == 0 {
            return self.remove_item(id);
        }

        let mut state = self.lock_idle()?;
        let Some(index) = state.position(id) else {
            return Err(CartError::NotFound(id.clone()));
        };

        let mut items = state.items.clone();
        if let Some(item) = items.get_mut(index) {
            item.quantity = quantity;
        }
        self.check_total(&items)?;

        let summary = self.commit(&mut state, items)?;
        info!(quantity, item_count = summary.item_count, "Updated item quantity");
        Ok(summary)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// - [`CartError::OrderInProgress`] during checkout
    /// - [`CartError::Storage`] if the cart cannot be saved
    #[instrument(skip(self))]
    pub fn clear_cart(&self) -> Result<CartSummary, CartError> {
        let mut state = self.lock_idle()?;
        let summary = self.commit(&mut state, Vec::new())?;
        info!("Cleared cart");
        Ok(summary)
    }

    /// Place an order for the current cart.
    ///
    /// Snapshots the cart, waits for the gateway (bounded by the policy
    /// timeout), records the order under the last-order key, and empties the
    /// cart. If the gateway does not confirm, the cart is left as it was.
    /// Once it confirms, the order stands: failing to save the receipt or the
    /// emptied cart is logged, and the in-memory cart is emptied anyway so a
    /// retry cannot place the same order twice.
    ///
    /// # Errors
    ///
    /// - [`CartError::AlreadyProcessing`] if an order is already in flight
    /// - [`CartError::EmptyCart`] if there is nothing to order
    /// - [`CartError::OrderFailed`] if the gateway fails or times out
    #[instrument(skip(self))]
    pub async fn process_order(&self) -> Result<OrderReceipt, CartError> {
        let order = {
            let mut state = self.lock();
            if state.phase == OrderPhase::Processing {
                warn!("Checkout requested while an order is in flight");
                return Err(CartError::AlreadyProcessing);
            }
            if state.items.is_empty() {
                return Err(CartError::EmptyCart);
            }
            state.phase = OrderPhase::Processing;
            PendingOrder {
                order_id: OrderId::generate(),
                items: state.items.clone(),
                total: total_of(&state.items).unwrap_or(Money::ZERO),
                placed_at: Utc::now(),
            }
        };
        let _processing = ProcessingGuard { state: &self.state };
        info!(order_id = %order.order_id, total = %order.total, "Processing order");

        let timeout = self.policy.order_timeout;
        match tokio::time::timeout(timeout, self.gateway.confirm(&order)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(order_id = %order.order_id, error = %e, "Order gateway failed");
                return Err(CartError::OrderFailed(e));
            }
            Err(_) => {
                warn!(order_id = %order.order_id, ?timeout, "Order gateway timed out");
                return Err(CartError::OrderFailed(GatewayError::TimedOut(timeout)));
            }
        }

        // The order is placed once the gateway confirms it; save failures
        // past this point are logged and the cart is emptied regardless.
        let receipt = OrderReceipt::from(order);
        if let Err(e) = self.persistence.set(keys::LAST_ORDER, &receipt) {
            error!(order_id = %receipt.order_id, error = %e, "Failed to record placed order");
        }
        {
            let mut state = self.lock();
            if let Err(e) = self.commit(&mut state, Vec::new()) {
                error!(order_id = %receipt.order_id, error = %e, "Failed to save emptied cart");
                state.items.clear();
                state.last_updated = Utc::now();
                let _ = self.events.send(CartEvent::Updated(state.summary()));
            }
        }
        let _ = self
            .events
            .send(CartEvent::OrderPlaced(receipt.order_id.clone()));

        info!(order_id = %receipt.order_id, "Order placed");
        Ok(receipt)
    }

    /// The most recently placed order, if any.
    #[must_use]
    pub fn last_order(&self) -> Option<OrderReceipt> {
        self.persistence.get(keys::LAST_ORDER)
    }

    /// Re-read the cart from storage, discarding in-memory state.
    ///
    /// Call this when another session reports that the cart changed. During
    /// checkout the reload is skipped so the in-flight snapshot stays
    /// consistent with what gets cleared.
    #[instrument(skip(self))]
    pub fn reload(&self) -> CartSummary {
        let mut state = self.lock();
        if state.phase == OrderPhase::Processing {
            debug!("Skipping reload during checkout");
            return state.summary();
        }

        let (items, last_updated) = read_cart(&self.persistence);
        state.items = items;
        state.last_updated = last_updated;
        let summary = state.summary();
        drop(state);

        debug!(items = summary.items.len(), "Reloaded cart from storage");
        let _ = self.events.send(CartEvent::Reloaded(summary.clone()));
        summary
    }

    /// React to an external storage change.
    ///
    /// Returns the reloaded summary if the event concerned the cart.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> Option<CartSummary> {
        event.is_for(keys::CART).then(|| self.reload())
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_idle(&self) -> Result<MutexGuard<'_, CartState>, CartError> {
        let state = self.lock();
        if state.phase == OrderPhase::Processing {
            debug!("Rejected cart change during checkout");
            return Err(CartError::OrderInProgress);
        }
        Ok(state)
    }

    fn check_total(&self, items: &[LineItem]) -> Result<(), CartError> {
        let max = self.policy.max_cart_total;
        match total_of(items) {
            Some(total) if total <= max => Ok(()),
            attempted => Err(CartError::LimitExceeded(Limit::CartTotal { max, attempted })),
        }
    }

    /// Persist `items`, then adopt them as the current cart.
    fn commit(
        &self,
        state: &mut CartState,
        items: Vec<LineItem>,
    ) -> Result<CartSummary, CartError> {
        let record = CartRecord {
            items,
            last_updated: Utc::now(),
        };
        self.persistence.set(keys::CART, &record)?;

        state.items = record.items;
        state.last_updated = record.last_updated;
        let summary = state.summary();
        let _ = self.events.send(CartEvent::Updated(summary.clone()));
        Ok(summary)
    }
}

fn clamp_quantity(requested: i64, max: u32) -> u32 {
    u32::try_from(requested.clamp(1, i64::from(max))).unwrap_or(1)
}

/// Read the persisted cart, dropping rows that break cart invariants.
fn read_cart(persistence: &Persistence) -> (Vec<LineItem>, DateTime<Utc>) {
    let Some(record) = persistence.get::<CartRecord>(keys::CART) else {
        return (Vec::new(), Utc::now());
    };

    let stored = record.items.len();
    let mut seen = HashSet::new();
    let items: Vec<LineItem> = record
        .items
        .into_iter()
        .map(|item| LineItem {
            id: item.id.canonical(),
            ..item
        })
        .filter(|item| item.quantity > 0 && !item.name.is_empty() && seen.insert(item.id.clone()))
        .collect();
    if items.len() != stored {
        warn!(
            dropped = stored - items.len(),
            "Dropped invalid rows from stored cart"
        );
    }
    (items, record.last_updated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::Poll;
    use std::time::Duration;

    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn store() -> (Arc<MemoryStorage>, CartStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CartStore::load(
            Persistence::new(storage.clone()),
            SimulatedGateway::new(Duration::from_millis(10)),
            CartPolicy::default(),
        );
        (storage, store)
    }

    fn book(id: &str, price: f64) -> ItemCandidate {
        ItemCandidate::new(id, format!("Book {id}"), price, format!("/img/{id}.jpg"))
    }

    #[test]
    fn test_new_item_quantity_is_clamped() {
        let (_, store) = store();
        let summary = store.add_item(book("b1", 5.0).with_quantity(25)).unwrap();
        assert_eq!(summary.items[0].quantity, 10);

        let summary = store.add_item(book("b2", 5.0).with_quantity(-3)).unwrap();
        assert_eq!(summary.item(&"b2".into()).unwrap().quantity, 1);
    }

    #[test]
    fn test_price_is_rounded_on_insert() {
        let (_, store) = store();
        let summary = store.add_item(book("b1", 3.456)).unwrap();
        assert_eq!(summary.items[0].price, Money::from_cents(346));
    }

    #[test]
    fn test_merge_keeps_first_price_and_name() {
        let (_, store) = store();
        store.add_item(book("b1", 10.0)).unwrap();
        let summary = store
            .add_item(ItemCandidate::new("b1", "Other", 99.0, "/x.jpg"))
            .unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].name, "Book b1");
        assert_eq!(summary.items[0].price, Money::from_cents(1000));
        assert_eq!(summary.items[0].quantity, 2);
    }

    #[test]
    fn test_merge_over_cap_is_rejected() {
        let (_, store) = store();
        store.add_item(book("b1", 1.0).with_quantity(8)).unwrap();
        let err = store.add_item(book("b1", 1.0).with_quantity(3)).unwrap_err();
        assert!(matches!(
            err,
            CartError::LimitExceeded(Limit::ItemQuantity {
                max: 10,
                requested: 11
            })
        ));
        assert_eq!(store.summary().items[0].quantity, 8);
    }

    #[test]
    fn test_validation_failure_leaves_cart_untouched() {
        let (storage, store) = store();
        let err = store.add_item(book("b1", 0.0)).unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(store.summary().is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_update_quantity_bounds() {
        let (_, store) = store();
        store.add_item(book("b1", 1.0)).unwrap();

        assert!(matches!(
            store.update_quantity(&"b1".into(), 11),
            Err(CartError::LimitExceeded(Limit::ItemQuantity {
                max: 10,
                requested: 11
            }))
        ));
        assert!(matches!(
            store.update_quantity(&"b1".into(), -1),
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            store.update_quantity(&"zz".into(), 3),
            Err(CartError::NotFound(_))
        ));

        assert_eq!(store.summary().item_count, 1);
        let summary = store.update_quantity(&"b1".into(), 4).unwrap();
        assert_eq!(summary.item_count, 4);
    }

    #[test]
    fn test_update_over_total_cap_is_rejected() {
        let (_, store) = store();
        store.add_item(book("b1", 2000.0)).unwrap();
        let err = store.update_quantity(&"b1".into(), 6).unwrap_err();
        assert!(matches!(
            err,
            CartError::LimitExceeded(Limit::CartTotal { .. })
        ));
        assert_eq!(store.summary().item_count, 1);
    }

    #[test]
    fn test_clear_cart() {
        let (_, store) = store();
        store.add_item(book("b1", 1.0)).unwrap();
        store.add_item(book("b2", 1.0)).unwrap();
        let summary = store.clear_cart().unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.total, Money::ZERO);
        assert!(store.clear_cart().unwrap().is_empty());
    }

    #[test]
    fn test_insertion_order_is_stable() {
        let (_, store) = store();
        for id in ["c", "a", "b"] {
            store.add_item(book(id, 1.0)).unwrap();
        }
        store.add_item(book("a", 1.0)).unwrap();
        let ids: Vec<String> = store
            .summary()
            .items
            .iter()
            .map(|item| item.id.to_string())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::CART, "{\"items\": 12").unwrap();
        let store: CartStore = CartStore::load(
            Persistence::new(storage),
            SimulatedGateway::default(),
            CartPolicy::default(),
        );
        assert!(store.summary().is_empty());
    }

    #[test]
    fn test_load_drops_invalid_rows() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                keys::CART,
                r#"{"items":[
                    {"id":1,"name":"A","price":1.0,"image":"/a","quantity":1},
                    {"id":1,"name":"A","price":1.0,"image":"/a","quantity":2},
                    {"id":"1","name":"A","price":1.0,"image":"/a","quantity":3},
                    {"id":2,"name":"B","price":1.0,"image":"/b","quantity":0}
                ],"lastUpdated":"2026-01-01T00:00:00Z"}"#,
            )
            .unwrap();
        let store: CartStore = CartStore::load(
            Persistence::new(storage),
            SimulatedGateway::default(),
            CartPolicy::default(),
        );
        let summary = store.summary();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.item_count, 1);
        assert_eq!(summary.items[0].id, ProductId::Numeric(1));
    }

    #[test]
    fn test_storage_event_triggers_reload() {
        let (storage, store) = store();
        store.add_item(book("b1", 1.0)).unwrap();

        // Another session empties the cart behind our back.
        let other: CartStore = CartStore::load(
            Persistence::new(storage),
            SimulatedGateway::default(),
            CartPolicy::default(),
        );
        other.clear_cart().unwrap();
        assert_eq!(store.summary().item_count, 1);

        assert!(store
            .handle_storage_event(&StorageEvent::new("lastOrder"))
            .is_none());
        let summary = store
            .handle_storage_event(&StorageEvent::new(keys::CART))
            .unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn test_subscribers_see_updates() {
        let (_, store) = store();
        let mut events = store.subscribe();
        store.add_item(book("b1", 1.0)).unwrap();

        match events.try_recv().unwrap() {
            CartEvent::Updated(summary) => assert_eq!(summary.item_count, 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_rejected_during_checkout() {
        let (_, store) = store();
        store.add_item(book("b1", 1.0)).unwrap();

        let checkout = store.process_order();
        tokio::pin!(checkout);
        assert!(poll_once(checkout.as_mut()).await.is_none());
        assert!(store.is_processing());

        assert!(matches!(
            store.add_item(book("b2", 1.0)),
            Err(CartError::OrderInProgress)
        ));
        assert!(matches!(
            store.clear_cart(),
            Err(CartError::OrderInProgress)
        ));

        checkout.await.unwrap();
        assert_eq!(store.phase(), OrderPhase::Idle);
        assert!(store.summary().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_checkout_resets_phase() {
        let (_, store) = store();
        store.add_item(book("b1", 1.0)).unwrap();
        {
            let checkout = store.process_order();
            tokio::pin!(checkout);
            assert!(poll_once(checkout.as_mut()).await.is_none());
            assert!(store.is_processing());
        }
        assert!(!store.is_processing());
        assert_eq!(store.summary().item_count, 1);
    }

    /// Poll a future once, returning its output if it completed.
    async fn poll_once<F: Future + Unpin>(mut fut: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| match Pin::new(&mut fut).poll(cx) {
            Poll::Ready(out) => Poll::Ready(Some(out)),
            Poll::Pending => Poll::Ready(None),
        })
        .await
    }
}
