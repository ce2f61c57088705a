//! Integration tests for order placement.
//!
//! Gateway delays run on paused tokio time, so these finish instantly.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use paperback_cart::storage::keys;
use paperback_cart::{
    CartAction, CartError, CartEvent, CartPolicy, CartStore, ErrorKind, GatewayError,
    MemoryStorage, OrderGateway, OrderPhase, OrderReceipt, Persistence, Storage,
};
use paperback_core::{Money, ProductId};
use paperback_integration_tests::{
    DecliningGateway, FaultyKeyStorage, RecordingStorage, StalledGateway, book, store_with,
};

fn store_over<G: OrderGateway>(gateway: G) -> (Arc<MemoryStorage>, CartStore<G>) {
    let backend = Arc::new(MemoryStorage::new());
    let policy = CartPolicy {
        order_timeout: Duration::from_secs(5),
        ..CartPolicy::default()
    };
    let store = CartStore::load(Persistence::new(backend.clone()), gateway, policy);
    (backend, store)
}

// =============================================================================
// Successful Orders
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_order_snapshot() {
    let backend = Arc::new(RecordingStorage::new());
    let store = store_with(backend.clone(), Duration::from_millis(1500));
    store.add_item(book(1_i64, 10.0).with_quantity(2)).unwrap();
    store.add_item(book(2_i64, 5.0)).unwrap();

    let receipt = store.process_order().await.unwrap();
    assert_eq!(receipt.total, Money::from_cents(2500));
    assert_eq!(receipt.items.len(), 2);
    assert!(receipt.order_id.as_str().starts_with("ORD-"));

    let recorded = store.last_order().unwrap();
    assert_eq!(recorded, receipt);
    let ids: Vec<_> = recorded.items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids, [ProductId::Numeric(1), ProductId::Numeric(2)]);

    let summary = store.summary();
    assert_eq!(summary.item_count, 0);
    assert!(summary.is_empty());
    assert_eq!(store.phase(), OrderPhase::Idle);
    assert_eq!(backend.writes(keys::LAST_ORDER), 1);
}

#[tokio::test(start_paused = true)]
async fn test_last_order_layout() {
    let backend = Arc::new(MemoryStorage::new());
    let store = store_with(backend.clone(), Duration::ZERO);
    store.add_item(book("b1", 7.25).with_quantity(2)).unwrap();
    store.process_order().await.unwrap();

    let raw = backend.get(keys::LAST_ORDER).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["orderId"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(json["total"], 14.5);
    assert_eq!(json["items"][0]["quantity"], 2);
    assert!(json["date"].is_string());

    let receipt: OrderReceipt = serde_json::from_value(json).unwrap();
    assert_eq!(Some(receipt), store.last_order());
}

#[tokio::test(start_paused = true)]
async fn test_order_events() {
    let store = store_with(Arc::new(MemoryStorage::new()), Duration::from_millis(10));
    store.add_item(book("b1", 10.0)).unwrap();
    let mut events = store.subscribe();

    let receipt = store.process_order().await.unwrap();

    assert!(matches!(events.try_recv().unwrap(), CartEvent::Updated(s) if s.is_empty()));
    assert_eq!(
        events.try_recv().unwrap(),
        CartEvent::OrderPlaced(receipt.order_id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_order_stands_when_cart_save_fails() {
    let backend = Arc::new(FaultyKeyStorage::new());
    let store = store_with(backend.clone(), Duration::from_millis(10));
    store.add_item(book("b1", 10.0)).unwrap();
    backend.fail_writes_to(keys::CART);

    let receipt = store.process_order().await.unwrap();

    assert_eq!(store.last_order(), Some(receipt));
    assert!(store.summary().is_empty());
    assert_eq!(store.phase(), OrderPhase::Idle);
    assert!(matches!(
        store.process_order().await,
        Err(CartError::EmptyCart)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_order_stands_when_receipt_save_fails() {
    let backend = Arc::new(FaultyKeyStorage::new());
    let store = store_with(backend.clone(), Duration::from_millis(10));
    store.add_item(book("b1", 10.0)).unwrap();
    backend.fail_writes_to(keys::LAST_ORDER);

    store.process_order().await.unwrap();

    assert!(store.last_order().is_none());
    assert!(store.summary().is_empty());
    assert!(store_with(backend, Duration::ZERO).summary().is_empty());
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_second_checkout_is_rejected() {
    let backend = Arc::new(RecordingStorage::new());
    let store = store_with(backend.clone(), Duration::from_millis(1500));
    store.add_item(book("b1", 10.0)).unwrap();

    let (first, second) = tokio::join!(store.process_order(), store.process_order());

    assert!(first.is_ok());
    assert!(matches!(second, Err(CartError::AlreadyProcessing)));
    assert_eq!(backend.writes(keys::LAST_ORDER), 1);
    assert_eq!(store.phase(), OrderPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_changes_during_checkout_are_rejected() {
    let store = store_with(Arc::new(MemoryStorage::new()), Duration::from_millis(1500));
    store.add_item(book("b1", 10.0)).unwrap();

    let mutate = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_processing());
        (
            store.add_item(book("b2", 1.0)),
            store.clear_cart(),
            store.apply(CartAction::Increment(ProductId::from("b1"))).await,
        )
    };
    let (order, (added, cleared, incremented)) = tokio::join!(store.process_order(), mutate);

    assert_eq!(added.unwrap_err().kind(), ErrorKind::OrderInProgress);
    assert_eq!(cleared.unwrap_err().kind(), ErrorKind::OrderInProgress);
    assert_eq!(incremented.unwrap_err().kind(), ErrorKind::OrderInProgress);

    let receipt = order.unwrap();
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].quantity, 1);
    assert!(store.summary().is_empty());
}

#[tokio::test]
async fn test_empty_checkout_writes_nothing() {
    let backend = Arc::new(RecordingStorage::new());
    let store = store_with(backend.clone(), Duration::ZERO);

    let err = store.process_order().await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
    assert_eq!(backend.total_writes(), 0);
    assert!(store.last_order().is_none());
}

// =============================================================================
// Gateway Failures
// =============================================================================

#[tokio::test]
async fn test_declined_order_keeps_cart() {
    let (backend, store) = store_over(DecliningGateway);
    store.add_item(book("b1", 10.0).with_quantity(2)).unwrap();
    let before = store.summary();

    let err = store.process_order().await.unwrap_err();
    assert!(matches!(
        err,
        CartError::OrderFailed(GatewayError::Declined(_))
    ));
    assert_eq!(store.summary(), before);
    assert_eq!(store.phase(), OrderPhase::Idle);
    assert!(backend.get(keys::LAST_ORDER).unwrap().is_none());

    // The cart is usable again after the failure.
    store.add_item(book("b2", 1.0)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_order_keeps_cart() {
    let (backend, store) = store_over(StalledGateway);
    store.add_item(book("b1", 10.0)).unwrap();
    let before = store.summary();

    let err = store.process_order().await.unwrap_err();
    assert!(matches!(
        err,
        CartError::OrderFailed(GatewayError::TimedOut(d)) if d == Duration::from_secs(5)
    ));
    assert_eq!(err.kind(), ErrorKind::OrderFailed);
    assert_eq!(store.summary(), before);
    assert!(!store.is_processing());
    assert!(backend.get(keys::LAST_ORDER).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reload_is_deferred_during_checkout() {
    let backend = Arc::new(MemoryStorage::new());
    let store = store_with(backend.clone(), Duration::from_millis(1500));
    let other_tab = store_with(backend, Duration::ZERO);
    store.add_item(book("b1", 10.0)).unwrap();

    let reload = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        other_tab.reload();
        other_tab.add_item(book("b2", 3.0)).unwrap();
        store.reload()
    };
    let (order, during) = tokio::join!(store.process_order(), reload);

    assert_eq!(during.item_count, 1);
    assert_eq!(order.unwrap().items.len(), 1);
}
