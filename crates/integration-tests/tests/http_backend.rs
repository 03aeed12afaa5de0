//! `HttpBackend` against a stub server.
//!
//! The stub speaks the backend's JSON shapes, including the loose ones
//! (wrapped product lists, `lines` instead of `items`, empty stock strings).

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use harvest_cart::{
    AddToCart, BackendError, CartBackend, CatalogBackend, HarvestConfig, HttpBackend,
};
use harvest_core::{
    DeliveryInfo, Money, OrderId, OrderStatus, ProductId, ProductType, Quantity, stock,
};
use harvest_integration_tests::session;

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<Value>>>);

impl Seen {
    fn push(&self, value: Value) {
        self.0.lock().push(value);
    }

    fn last(&self) -> Value {
        self.0.lock().last().cloned().unwrap_or(Value::Null)
    }
}

async fn products() -> Json<Value> {
    Json(json!({
        "products": [
            {
                "id": 1, "name": "Salade", "price": "2.40", "saleUnit": "piece",
                "productType": "fresh",
                "batches": [
                    {"id": 10, "stock": "3", "isAntigaspi": true, "harvestDate": "2026-10-14T07:00:00Z"},
                    {"id": 11, "stock": 5, "isAntigaspi": false, "harvestDate": "2026-10-17T07:00:00Z"}
                ]
            },
            {"id": 2, "name": "Miel", "price": 9, "productType": "dry", "stock": ""}
        ]
    }))
}

async fn product(Path(id): Path<i32>) -> Response {
    if id == 404 {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Produit introuvable"})),
        )
            .into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
    }
}

async fn search(State(seen): State<Seen>, RawQuery(query): RawQuery) -> Json<Value> {
    seen.push(Value::String(query.unwrap_or_default()));
    Json(json!([]))
}

async fn cart(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer token-7");
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "lines": [{"id": "l1", "productId": 1, "quantity": "1.5", "unitPrice": "2.40"}]
    }))
    .into_response()
}

async fn add_item(State(seen): State<Seen>, Json(body): Json<Value>) -> Response {
    seen.push(body);
    (
        StatusCode::CONFLICT,
        Json(json!({"message": "Stock insuffisant"})),
    )
        .into_response()
}

async fn checkout(State(seen): State<Seen>, Json(body): Json<Value>) -> Response {
    seen.push(body);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 5, "status": "confirmed", "total": "18.40",
            "items": [], "createdAt": "2026-10-18T09:00:00Z"
        })),
    )
        .into_response()
}

async fn serve() -> (HttpBackend, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/products", get(products))
        .route("/api/products/search", get(search))
        .route("/api/products/{id}", get(product))
        .route("/api/cart", get(cart))
        .route("/api/cart/items", post(add_item))
        .route("/api/orders", post(checkout))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let config = HarvestConfig::with_api_url(format!("http://{addr}/api/").parse().unwrap());
    (HttpBackend::new(&config).unwrap(), seen)
}

#[tokio::test]
async fn test_product_list_is_normalised() {
    let (backend, _) = serve().await;
    let products = backend.list_products().await.unwrap();

    assert_eq!(products.len(), 2);
    let salad = &products[0];
    assert_eq!(salad.product_type(), ProductType::Fresh);
    assert_eq!(stock::total_stock(salad), Decimal::from(8));
    assert_eq!(stock::antigaspi_stock(salad), Decimal::from(3));
    assert_eq!(stock::effective_price(salad, true), Money::new(Decimal::new(120, 2)));

    let honey = &products[1];
    assert_eq!(honey.product_type(), ProductType::Dry);
    assert_eq!(stock::total_stock(honey), Decimal::ZERO);
    assert_eq!(honey.sale_unit, "unit");
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let (backend, _) = serve().await;

    assert_eq!(
        backend.get_product_details(ProductId::new(404)).await,
        Err(BackendError::NotFound("Produit introuvable".to_string()))
    );
    assert_eq!(
        backend.get_product_details(ProductId::new(1)).await,
        Err(BackendError::Rejected("upstream exploded".to_string()))
    );
}

#[tokio::test]
async fn test_cart_uses_bearer_token() {
    let (backend, _) = serve().await;

    let lines = backend.get_cart(&session(7)).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.value(), Decimal::new(15, 1));
    assert_eq!(lines[0].batch_id, None);

    assert_eq!(
        backend.get_cart(&session(8)).await,
        Err(BackendError::Unauthorized)
    );
}

#[tokio::test]
async fn test_add_to_cart_body_and_rejection() {
    let (backend, seen) = serve().await;
    let item = AddToCart {
        product_id: ProductId::new(1),
        quantity: Quantity::try_from(12_i64).unwrap(),
        batch_id: None,
        is_antigaspi: true,
    };

    let err = backend.add_to_cart(&session(7), &item).await.unwrap_err();
    assert_eq!(err, BackendError::Rejected("Stock insuffisant".to_string()));

    let body = seen.last();
    assert_eq!(body["productId"], json!(1));
    assert_eq!(body["quantity"], json!("12"));
    assert_eq!(body["isAntigaspi"], json!(true));
    assert!(body.get("batchId").is_none());
}

#[tokio::test]
async fn test_checkout_posts_delivery_info() {
    let (backend, seen) = serve().await;
    let delivery = DeliveryInfo {
        address: "3 rue des Lilas".to_string(),
        city: "Lyon".to_string(),
        postal_code: "69003".to_string(),
        phone: None,
        delivery_date: None,
        notes: None,
    };

    let order = backend.checkout(&session(7), &delivery).await.unwrap();
    assert_eq!(order.id, OrderId::new(5));
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.total, Money::new(Decimal::new(1840, 2)));

    let body = seen.last();
    assert_eq!(body["deliveryInfo"]["postalCode"], json!("69003"));
    assert!(body["deliveryInfo"].get("phone").is_none());
}

#[tokio::test]
async fn test_search_query_is_encoded() {
    let (backend, seen) = serve().await;
    backend.search_products("pomme de terre").await.unwrap();
    assert_eq!(seen.last(), json!("q=pomme+de+terre"));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = HarvestConfig::with_api_url(format!("http://{addr}/").parse().unwrap());
    let backend = HttpBackend::new(&config).unwrap();

    assert!(matches!(
        backend.list_products().await,
        Err(BackendError::Network(_))
    ));
}
