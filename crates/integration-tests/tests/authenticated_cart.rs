//! Authenticated cart: backend round-trips, failures and interleavings.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use harvest_cart::{
    AddToCart, BackendError, CartCommand, CartEngine, CartError, LocalCartStore, MemoryStore,
    StaticIdentity,
};
use harvest_core::{
    BatchId, CartMode, DeliveryInfo, LineId, Money, ProductId, Quantity, UserId,
};
use harvest_integration_tests::{FakeBackend, Op, client, line, sample_catalog};

const USER: i32 = 7;

async fn client_engine(
    backend: &Arc<FakeBackend>,
    store: Arc<dyn LocalCartStore>,
) -> CartEngine {
    CartEngine::start(
        Arc::new(StaticIdentity::new(client(USER))),
        backend.clone(),
        store,
    )
    .await
}

fn delivery() -> DeliveryInfo {
    DeliveryInfo {
        address: "12 chemin des Vignes".to_string(),
        city: "Villeurbanne".to_string(),
        postal_code: "69100".to_string(),
        phone: Some("0600000000".to_string()),
        delivery_date: None,
        notes: Some("Sonner deux fois".to_string()),
    }
}

#[tokio::test]
async fn test_start_loads_server_cart() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);

    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;

    assert_eq!(engine.mode(), CartMode::Authenticated);
    assert_eq!(engine.cart().lines, backend.server_cart(UserId::new(USER)));
    assert_eq!(backend.call_count(Op::GetCart), 1);
}

#[tokio::test]
async fn test_mutations_refetch_and_never_touch_local_store() {
    let backend = FakeBackend::with_products(sample_catalog());
    let store = Arc::new(MemoryStore::new());
    let engine = client_engine(&backend, store.clone()).await;
    let carrots = &sample_catalog()[0];

    let cart = engine
        .add_line(carrots, "2", Some(BatchId::new(10)), true)
        .await
        .unwrap();
    assert_eq!(
        backend.calls(),
        vec![Op::GetCart, Op::AddToCart, Op::GetCart]
    );
    assert_eq!(cart.lines, backend.server_cart(UserId::new(USER)));
    assert_eq!(cart.lines[0].unit_price, Money::from_units(2));

    let line_id = cart.lines[0].id.clone();
    let cart = engine
        .update_quantity(&line_id, Decimal::from(3))
        .await
        .unwrap();
    assert_eq!(cart.lines[0].quantity, Quantity::try_from(3_i64).unwrap());

    let cart = engine.update_quantity(&line_id, Decimal::ZERO).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(backend.call_count(Op::RemoveFromCart), 1);
    assert_eq!(backend.call_count(Op::UpdateCartItem), 1);

    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_rejection_surfaces_verbatim() {
    let backend = FakeBackend::with_products(sample_catalog());
    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;
    let radishes = &sample_catalog()[2];

    let err = engine
        .add_line(radishes, 100_i64, None, false)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Stock insuffisant pour Radis");
    assert_eq!(err, CartError::ServerRejected("Stock insuffisant pour Radis".to_string()));
    assert!(engine.cart().is_empty());
    assert_eq!(engine.last_error(), Some(err));
    // No refetch after a failed mutation
    assert_eq!(backend.call_count(Op::GetCart), 1);

    engine.clear_error();
    assert_eq!(engine.last_error(), None);
}

#[tokio::test]
async fn test_failed_clear_leaves_cart_unchanged() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(
        UserId::new(USER),
        vec![line("s1", 1, 4, 2), line("s2", 2, 5, 1)],
    );
    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;
    let before = engine.cart();

    backend.fail_next(Op::ClearCart, BackendError::Network("connection reset".to_string()));
    let err = engine.clear().await.unwrap_err();

    assert!(matches!(err, CartError::NetworkFailure(_)));
    assert_eq!(engine.cart(), before);
    assert_eq!(backend.server_cart(UserId::new(USER)).len(), 2);

    let cart = engine.clear().await.unwrap();
    assert!(cart.is_empty());
    assert!(engine.cart().is_empty());
    assert!(backend.server_cart(UserId::new(USER)).is_empty());
}

#[tokio::test]
async fn test_failed_fetch_falls_back_to_local_snapshot() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);
    let snapshot = vec![line("local", 2, 5, 4)];

    backend.fail_next(Op::GetCart, BackendError::Network("timeout".to_string()));
    let engine = client_engine(&backend, Arc::new(MemoryStore::with_lines(snapshot.clone()))).await;

    let state = engine.snapshot();
    assert!(state.stale);
    assert_eq!(state.cart.lines, snapshot);
    assert_eq!(state.cart.mode, CartMode::Authenticated);
    assert!(matches!(state.last_error, Some(CartError::NetworkFailure(_))));

    let cart = engine.fetch_cart().await.unwrap();
    assert_eq!(cart.lines[0].id, LineId::from("s1"));
    let state = engine.snapshot();
    assert!(!state.stale);
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn test_checkout_trusts_backend_total() {
    let backend = FakeBackend::with_products(sample_catalog());
    // Client-side price is stale; the backend total wins
    backend.seed_cart(UserId::new(USER), vec![line("s1", 2, 5, 2)]);
    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;

    let order = engine.checkout(&delivery()).await.unwrap();
    assert_eq!(order.total, Money::from_units(10));
    assert_eq!(order.lines.len(), 1);
    assert!(engine.cart().is_empty());
    assert!(backend.server_cart(UserId::new(USER)).is_empty());

    // Empty cart now: the backend refuses and the cart stays as it is
    let err = engine.checkout(&delivery()).await.unwrap_err();
    assert_eq!(err, CartError::ServerRejected("Le panier est vide".to_string()));
    assert!(engine.cart().is_empty());
}

#[tokio::test]
async fn test_failed_checkout_keeps_cart() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 2, 5, 2)]);
    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;
    let before = engine.cart();

    backend.fail_next(Op::Checkout, BackendError::Unauthorized);
    assert_eq!(
        engine.checkout(&delivery()).await,
        Err(CartError::NotAuthenticated)
    );
    assert_eq!(engine.cart(), before);
}

#[tokio::test]
async fn test_execute_remote_returns_refetched_cart() {
    let backend = FakeBackend::with_products(sample_catalog());
    let engine = client_engine(&backend, Arc::new(MemoryStore::new())).await;

    let cart = engine
        .execute_remote(CartCommand::Add(AddToCart {
            product_id: ProductId::new(2),
            quantity: Quantity::try_from(4_i64).unwrap(),
            batch_id: None,
            is_antigaspi: false,
        }))
        .await
        .unwrap();

    assert_eq!(cart.mode, CartMode::Authenticated);
    assert_eq!(cart.total_price(), Money::from_units(20));
    assert_eq!(engine.cart(), cart);
}

#[tokio::test]
async fn test_stale_fetch_does_not_clobber_newer_update() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);
    let engine = Arc::new(client_engine(&backend, Arc::new(MemoryStore::new())).await);

    // Slow fetch reads the cart while it still holds 2 kg
    let mut paused = backend.pause_next(Op::GetCart);
    let slow = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_cart().await }
    });
    paused.reached().await;

    // Fast update lands first
    let updated = engine
        .update_quantity(&LineId::from("s1"), Decimal::from(5))
        .await
        .unwrap();
    assert_eq!(updated.lines[0].quantity.value(), Decimal::from(5));

    paused.release();
    let stale = slow.await.unwrap().unwrap();

    // The slow result is returned to its caller but not adopted
    assert_eq!(stale.lines[0].quantity.value(), Decimal::from(2));
    assert_eq!(engine.cart().lines[0].quantity.value(), Decimal::from(5));
}

#[tokio::test]
async fn test_result_after_detach_is_not_written() {
    let backend = FakeBackend::with_products(sample_catalog());
    let engine = Arc::new(client_engine(&backend, Arc::new(MemoryStore::new())).await);
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);

    let mut paused = backend.pause_next(Op::GetCart);
    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_cart().await }
    });
    paused.reached().await;

    engine.detach();
    paused.release();

    let fetched = pending.await.unwrap().unwrap();
    assert_eq!(fetched.lines.len(), 1);
    assert!(engine.cart().is_empty());
    assert_eq!(engine.fetch_cart().await, Err(CartError::Detached));
}

#[tokio::test]
async fn test_fetch_during_slow_update_does_not_hide_update() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);
    let engine = Arc::new(client_engine(&backend, Arc::new(MemoryStore::new())).await);

    // Update is held before the backend applies it
    let mut paused = backend.pause_next(Op::UpdateCartItem);
    let update = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .update_quantity(&LineId::from("s1"), Decimal::from(5))
                .await
        }
    });
    paused.reached().await;

    // A fetch in the meantime still sees 2 kg
    let fetched = engine.fetch_cart().await.unwrap();
    assert_eq!(fetched.lines[0].quantity.value(), Decimal::from(2));

    paused.release();
    let updated = update.await.unwrap().unwrap();
    assert_eq!(updated.lines[0].quantity.value(), Decimal::from(5));

    let state = engine.snapshot();
    assert_eq!(state.cart.lines, backend.server_cart(UserId::new(USER)));
    assert_eq!(state.cart.lines[0].quantity.value(), Decimal::from(5));
    assert!(!state.stale);
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn test_superseded_fetch_failure_is_not_recorded() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 1, 4, 2)]);
    let store = Arc::new(MemoryStore::with_lines(vec![line("local", 2, 5, 1)]));
    let engine = Arc::new(client_engine(&backend, store).await);

    backend.fail_next(Op::GetCart, BackendError::Network("timeout".to_string()));
    let mut paused = backend.pause_next(Op::GetCart);
    let slow = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_cart().await }
    });
    paused.reached().await;

    engine.fetch_cart().await.unwrap();

    paused.release();
    assert!(matches!(
        slow.await.unwrap(),
        Err(CartError::NetworkFailure(_))
    ));

    let state = engine.snapshot();
    assert_eq!(state.cart.lines[0].id, LineId::from("s1"));
    assert!(!state.stale);
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn test_checkout_after_detach_keeps_local_slot() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(USER), vec![line("s1", 2, 5, 2)]);
    let store = Arc::new(MemoryStore::with_lines(vec![line("local", 1, 4, 1)]));
    let engine = Arc::new(client_engine(&backend, store.clone()).await);
    let before = engine.cart();

    let mut paused = backend.pause_next(Op::Checkout);
    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.checkout(&delivery()).await }
    });
    paused.reached().await;

    engine.detach();
    paused.release();

    // The order went through, but nothing local is touched
    let order = pending.await.unwrap().unwrap();
    assert_eq!(order.lines.len(), 1);
    assert_eq!(store.load().unwrap().len(), 1);
    assert_eq!(engine.cart(), before);
}
