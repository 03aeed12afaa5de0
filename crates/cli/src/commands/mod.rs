//! Command implementations.

use std::sync::Arc;

use thiserror::Error;

use harvest_cart::{
    BackendError, CartEngine, CartError, CatalogError, CatalogStore, ConfigError, HarvestConfig,
    HttpBackend, InventoryError, JsonFileStore, ProducerInventory, StaticIdentity,
};
use harvest_core::ProductId;

pub mod cart;
pub mod catalog;
pub mod stock;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("product {0} not found")]
    UnknownProduct(ProductId),

    #[error("JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared wiring built once per invocation.
pub struct Context {
    pub config: HarvestConfig,
    backend: Arc<HttpBackend>,
    identity: Arc<StaticIdentity>,
    pub catalog: Arc<CatalogStore>,
}

impl Context {
    /// Load configuration and build the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or the HTTP client
    /// can't be built.
    pub fn from_env() -> Result<Self, CliError> {
        let config = HarvestConfig::from_env()?;
        let backend = Arc::new(HttpBackend::new(&config)?);
        let identity = Arc::new(StaticIdentity::new(config.identity()));
        let catalog = Arc::new(CatalogStore::new(
            backend.clone(),
            config.catalog_cache_ttl,
        ));

        tracing::debug!(api_url = %config.api_url, "Configuration loaded");

        Ok(Self {
            config,
            backend,
            identity,
            catalog,
        })
    }

    /// Cart engine for the configured identity, already loaded.
    pub async fn cart_engine(&self) -> CartEngine {
        CartEngine::start(
            self.identity.clone(),
            self.backend.clone(),
            Arc::new(JsonFileStore::new(&self.config.guest_cart_path)),
        )
        .await
    }

    /// Producer stock service wired to the catalog cache.
    pub fn producer_inventory(&self) -> ProducerInventory {
        ProducerInventory::new(self.identity.clone(), self.backend.clone())
            .with_catalog(self.catalog.clone())
    }
}
