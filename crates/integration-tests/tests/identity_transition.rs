//! Identity changes: the engine follows the identity source and never
//! carries guest lines into an account.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use harvest_cart::{CartEngine, LocalCartStore, MemoryStore, WatchIdentity};
use harvest_core::{CartMode, Identity, Role, UserId};
use harvest_integration_tests::{FakeBackend, Op, client, line, sample_catalog, session};

#[tokio::test]
async fn test_login_does_not_copy_guest_lines() {
    let backend = FakeBackend::with_products(sample_catalog());
    let store = Arc::new(MemoryStore::with_lines(vec![line("g1", 1, 4, 2)]));
    let (publisher, identity) = WatchIdentity::channel(Identity::anonymous());

    let engine = CartEngine::start(Arc::new(identity), backend.clone(), store.clone()).await;
    assert_eq!(engine.mode(), CartMode::Guest);
    assert_eq!(engine.cart().lines.len(), 1);

    publisher.publish(client(7));
    assert_eq!(engine.sync_identity().await, CartMode::Authenticated);

    assert!(engine.cart().is_empty());
    assert!(backend.server_cart(UserId::new(7)).is_empty());
    assert_eq!(backend.call_count(Op::AddToCart), 0);
    // The guest slot is left alone
    assert_eq!(store.load().unwrap().len(), 1);
}

#[tokio::test]
async fn test_logout_restores_guest_cart() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(7), vec![line("s1", 2, 5, 3)]);
    let store = Arc::new(MemoryStore::with_lines(vec![line("g1", 1, 4, 2)]));
    let (publisher, identity) = WatchIdentity::channel(client(7));

    let engine = CartEngine::start(Arc::new(identity), backend.clone(), store).await;
    assert_eq!(engine.cart().lines[0].id.as_str(), "s1");

    publisher.sign_out();
    assert_eq!(engine.sync_identity().await, CartMode::Guest);
    assert_eq!(engine.cart().lines[0].id.as_str(), "g1");
}

#[tokio::test]
async fn test_switching_accounts_reloads() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(7), vec![line("seven", 1, 4, 1)]);
    backend.seed_cart(UserId::new(8), vec![line("eight", 2, 5, 1)]);
    let (publisher, identity) = WatchIdentity::channel(client(7));

    let engine =
        CartEngine::start(Arc::new(identity), backend.clone(), Arc::new(MemoryStore::new())).await;
    assert_eq!(engine.cart().lines[0].id.as_str(), "seven");

    publisher.publish(client(8));
    engine.sync_identity().await;
    assert_eq!(engine.cart().lines[0].id.as_str(), "eight");

    // Same identity again: no reload
    let fetches = backend.call_count(Op::GetCart);
    engine.sync_identity().await;
    assert_eq!(backend.call_count(Op::GetCart), fetches);
}

#[tokio::test]
async fn test_operations_follow_identity_without_explicit_sync() {
    let backend = FakeBackend::with_products(sample_catalog());
    let (publisher, identity) = WatchIdentity::channel(Identity::anonymous());
    let engine =
        CartEngine::start(Arc::new(identity), backend.clone(), Arc::new(MemoryStore::new())).await;

    publisher.publish(client(9));
    let lentils = &sample_catalog()[1];
    let cart = engine.add_line(lentils, 1_i64, None, false).await.unwrap();

    assert_eq!(cart.mode, CartMode::Authenticated);
    assert_eq!(backend.server_cart(UserId::new(9)).len(), 1);
}

#[tokio::test]
async fn test_expired_session_is_guest() {
    let backend = FakeBackend::with_products(sample_catalog());
    let mut expired = session(7);
    expired.expires_at = Some(Utc::now() - Duration::minutes(1));
    let (_publisher, identity) = WatchIdentity::channel(Identity::signed_in(expired, Role::Client));

    let engine =
        CartEngine::start(Arc::new(identity), backend.clone(), Arc::new(MemoryStore::new())).await;

    assert_eq!(engine.mode(), CartMode::Guest);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_host_loop_follows_published_identity() {
    let backend = FakeBackend::with_products(sample_catalog());
    backend.seed_cart(UserId::new(7), vec![line("s1", 1, 4, 1)]);
    let (publisher, identity) = WatchIdentity::channel(Identity::anonymous());
    let mut watcher = identity.clone();

    let engine = Arc::new(
        CartEngine::start(Arc::new(identity), backend.clone(), Arc::new(MemoryStore::new())).await,
    );

    let host = tokio::spawn({
        let engine = engine.clone();
        async move {
            while watcher.changed().await.is_ok() {
                engine.sync_identity().await;
            }
        }
    });

    publisher.publish(client(7));
    drop(publisher);
    host.await.unwrap();

    assert_eq!(engine.mode(), CartMode::Authenticated);
    assert_eq!(engine.cart().lines.len(), 1);
}
