//! Harvest Cart - catalog mirror and dual-mode shopping cart.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, batches and
//!   authenticated carts. Nothing here writes a server-side cart locally.
//! - Guest carts live in a [`LocalCartStore`] slot and survive restarts.
//! - Every external collaborator (identity provider, backend, local store)
//!   is injected through the traits in [`ports`], so the engine can be
//!   exercised without a network or a UI.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use harvest_cart::{CartEngine, HttpBackend, JsonFileStore, StaticIdentity};
//!
//! let backend = Arc::new(HttpBackend::new(&config)?);
//! let engine = CartEngine::start(
//!     Arc::new(StaticIdentity::new(identity)),
//!     backend.clone(),
//!     Arc::new(JsonFileStore::new(&config.guest_cart_path)),
//! )
//! .await;
//!
//! let cart = engine.add_line(&product, "1.5", None, false).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
mod gate;
pub mod identity;
pub mod inventory;
pub mod local_store;
pub mod ports;

pub use api::HttpBackend;
pub use catalog::CatalogStore;
pub use config::{ConfigError, HarvestConfig};
pub use engine::{CartCommand, CartEngine, CartLineView, CartSnapshot};
pub use error::{CartError, CatalogError, InventoryError};
pub use identity::{IdentityPublisher, StaticIdentity, WatchIdentity};
pub use inventory::ProducerInventory;
pub use local_store::{JsonFileStore, MemoryStore, StoreError};
pub use ports::{
    AddToCart, BackendError, CartBackend, CatalogBackend, IdentitySource, InventoryBackend,
    LocalCartStore,
};
