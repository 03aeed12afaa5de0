//! Ports to the external collaborators.
//!
//! The engine and stores depend only on these traits. [`crate::HttpBackend`]
//! implements the backend ports over HTTP; the integration tests implement
//! them in memory.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use harvest_core::{
    Batch, BatchId, CartLine, DeliveryInfo, Identity, LineId, NewBatch, Order, Product,
    ProductId, Quantity, Session,
};

use crate::local_store::StoreError;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The backend refused the request on a business rule (e.g. stock).
    #[error("{0}")]
    Rejected(String),

    /// The session was rejected.
    #[error("session rejected by backend")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Request body for adding a line to a server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    /// Product to add.
    pub product_id: ProductId,
    /// Quantity to add.
    pub quantity: Quantity,
    /// Specific batch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    /// Request the anti-waste tier.
    pub is_antigaspi: bool,
}

/// Supplies the current identity.
pub trait IdentitySource: Send + Sync {
    /// Current identity snapshot.
    fn current(&self) -> Identity;
}

/// Server-side cart and order operations.
///
/// Mutations return nothing: callers refetch with [`CartBackend::get_cart`]
/// so prices and discounts stay server-authoritative.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Fetch the session's cart.
    async fn get_cart(&self, session: &Session) -> Result<Vec<CartLine>, BackendError>;

    /// Add a line (the backend merges or appends).
    async fn add_to_cart(&self, session: &Session, item: &AddToCart) -> Result<(), BackendError>;

    /// Remove a line.
    async fn remove_from_cart(&self, session: &Session, line_id: &LineId)
    -> Result<(), BackendError>;

    /// Set a line's quantity.
    async fn update_cart_item(
        &self,
        session: &Session,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<(), BackendError>;

    /// Remove every line.
    async fn clear_cart(&self, session: &Session) -> Result<(), BackendError>;

    /// Turn the cart into an order.
    async fn checkout(
        &self,
        session: &Session,
        delivery: &DeliveryInfo,
    ) -> Result<Order, BackendError>;
}

/// Product catalog reads.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// All products.
    async fn list_products(&self) -> Result<Vec<Product>, BackendError>;

    /// One product with its batches.
    async fn get_product_details(&self, id: ProductId) -> Result<Product, BackendError>;

    /// Products matching a free-text query.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, BackendError>;
}

/// Producer stock management.
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// Register a harvested batch for a fresh product.
    async fn add_batch(
        &self,
        session: &Session,
        product_id: ProductId,
        batch: &NewBatch,
    ) -> Result<Batch, BackendError>;

    /// Overwrite a batch's stock.
    async fn update_batch_stock(
        &self,
        session: &Session,
        batch_id: BatchId,
        stock: Decimal,
    ) -> Result<(), BackendError>;

    /// Overwrite a dry product's stock.
    async fn update_dry_stock(
        &self,
        session: &Session,
        product_id: ProductId,
        stock: Decimal,
    ) -> Result<(), BackendError>;
}

/// Guest-cart persistence slot.
pub trait LocalCartStore: Send + Sync {
    /// Load the persisted lines. A missing slot is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read or parsed.
    fn load(&self) -> Result<Vec<CartLine>, StoreError>;

    /// Replace the persisted lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError>;

    /// Empty the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be removed.
    fn clear(&self) -> Result<(), StoreError>;
}
