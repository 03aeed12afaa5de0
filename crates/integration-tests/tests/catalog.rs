//! Catalog mirror over the fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use harvest_cart::{BackendError, CatalogError, CatalogStore, ProducerInventory, StaticIdentity};
use harvest_core::{Money, ProductId, stock};
use harvest_integration_tests::{FakeBackend, Op, producer, sample_catalog};

fn store(backend: &Arc<FakeBackend>) -> CatalogStore {
    CatalogStore::new(backend.clone(), Duration::from_secs(300))
}

#[tokio::test]
async fn test_derived_stock_and_prices() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = store(&backend);
    catalog.fetch_all().await.unwrap();

    let carrots = ProductId::new(1);
    assert_eq!(catalog.total_stock(carrots), Decimal::from(26));
    assert_eq!(catalog.antigaspi_stock(carrots), Decimal::from(6));
    assert_eq!(catalog.regular_stock(carrots), Decimal::from(20));
    assert!(catalog.has_antigaspi(carrots));
    assert_eq!(catalog.effective_price(carrots, true), Some(Money::from_units(2)));
    assert_eq!(catalog.effective_price(carrots, false), Some(Money::from_units(4)));

    let radishes = ProductId::new(3);
    assert!(!catalog.has_antigaspi(radishes));
    assert_eq!(catalog.effective_price(radishes, true), Some(Money::from_units(2)));

    let lentils = ProductId::new(2);
    assert_eq!(catalog.total_stock(lentils), Decimal::from(40));
    assert_eq!(catalog.antigaspi_stock(lentils), Decimal::ZERO);

    let antigaspi: Vec<_> = catalog.antigaspi_products().into_iter().map(|p| p.id).collect();
    assert_eq!(antigaspi, vec![carrots]);

    for p in catalog.products() {
        assert_eq!(
            stock::antigaspi_stock(&p) + stock::regular_stock(&p),
            stock::total_stock(&p)
        );
    }
}

#[tokio::test]
async fn test_fetch_failure_keeps_list_and_sets_flag() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = store(&backend);
    catalog.fetch_all().await.unwrap();

    backend.fail_next(Op::ListProducts, BackendError::Network("dns".to_string()));
    let err = catalog.fetch_all().await.unwrap_err();

    assert_eq!(err, CatalogError::Backend(BackendError::Network("dns".to_string())));
    assert!(catalog.has_error());
    assert_eq!(catalog.last_error(), Some(err));
    assert_eq!(catalog.products().len(), 3);

    // No retry happened on its own
    assert_eq!(backend.call_count(Op::ListProducts), 2);

    catalog.fetch_all().await.unwrap();
    assert!(!catalog.has_error());
}

#[tokio::test]
async fn test_search_and_details() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = store(&backend);

    let found = catalog.search("lentilles").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ProductId::new(2));

    let missing = catalog.product_details(ProductId::new(404)).await.unwrap_err();
    assert!(matches!(missing, CatalogError::Backend(BackendError::NotFound(_))));

    catalog.product_details(ProductId::new(1)).await.unwrap();
    catalog.product_details(ProductId::new(1)).await.unwrap();
    assert_eq!(backend.call_count(Op::GetProductDetails), 2);
}

#[tokio::test]
async fn test_stock_update_invalidates_details() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = Arc::new(store(&backend));
    let inventory = ProducerInventory::new(Arc::new(StaticIdentity::new(producer(2))), backend.clone())
        .with_catalog(catalog.clone());

    let lentils = ProductId::new(2);
    let before = catalog.product_details(lentils).await.unwrap();
    assert_eq!(stock::total_stock(&before), Decimal::from(40));

    inventory.update_dry_stock(lentils, Decimal::from(12)).await.unwrap();

    let after = catalog.product_details(lentils).await.unwrap();
    assert_eq!(stock::total_stock(&after), Decimal::from(12));
    assert_eq!(backend.call_count(Op::GetProductDetails), 2);
}

#[tokio::test]
async fn test_stale_list_does_not_replace_newer_list() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = Arc::new(store(&backend));
    let inventory = ProducerInventory::new(Arc::new(StaticIdentity::new(producer(2))), backend.clone());

    let mut paused = backend.pause_next(Op::ListProducts);
    let slow = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.fetch_all().await }
    });
    paused.reached().await;

    inventory
        .update_dry_stock(ProductId::new(2), Decimal::from(7))
        .await
        .unwrap();
    catalog.fetch_all().await.unwrap();

    paused.release();
    slow.await.unwrap().unwrap();

    assert_eq!(catalog.total_stock(ProductId::new(2)), Decimal::from(7));
}

#[tokio::test]
async fn test_superseded_failure_does_not_raise_flag() {
    let backend = FakeBackend::with_products(sample_catalog());
    let catalog = Arc::new(store(&backend));

    backend.fail_next(Op::ListProducts, BackendError::Network("dns".to_string()));
    let mut paused = backend.pause_next(Op::ListProducts);
    let slow = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.fetch_all().await }
    });
    paused.reached().await;

    catalog.fetch_all().await.unwrap();

    paused.release();
    assert!(slow.await.unwrap().is_err());
    assert!(!catalog.has_error());
    assert_eq!(catalog.last_error(), None);
    assert_eq!(catalog.products().len(), 3);
}
