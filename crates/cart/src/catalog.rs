//! Catalog mirror.
//!
//! Holds the product list fetched from the backend and answers derived
//! stock and pricing queries over it. The list is replaced wholesale on a
//! successful [`CatalogStore::fetch_all`]; a failed fetch keeps the previous
//! list and raises the error flag. Nothing retries on its own.
//!
//! Per-product details are cached in `moka` with a TTL and dropped whenever
//! the list is refreshed or stock is mutated.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use harvest_core::{Money, Product, ProductId, stock};

use crate::error::CatalogError;
use crate::gate::{RefreshGate, Watermark};
use crate::ports::CatalogBackend;

/// Default detail cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    last_error: Option<CatalogError>,
    watermark: Watermark,
}

/// Mirrored product catalog.
pub struct CatalogStore {
    backend: Arc<dyn CatalogBackend>,
    state: RwLock<CatalogState>,
    gate: RefreshGate,
    details: Cache<ProductId, Product>,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("state", &self.state)
            .field("cached_details", &self.details.entry_count())
            .finish_non_exhaustive()
    }
}

impl CatalogStore {
    /// Create an empty mirror.
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogBackend>, cache_ttl: Duration) -> Self {
        let details = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            backend,
            state: RwLock::new(CatalogState::default()),
            gate: RefreshGate::new(),
            details,
        }
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Replace the mirrored list with the backend's.
    ///
    /// # Errors
    ///
    /// Returns the backend error. The previous list is kept and
    /// [`CatalogStore::has_error`] turns `true` until the next success.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Product>, CatalogError> {
        let ticket = self.gate.begin();

        match self.backend.list_products().await {
            Ok(products) => {
                info!(count = products.len(), "Catalog refreshed");
                {
                    let mut state = self.state.write();
                    if state.watermark.admit(ticket) {
                        state.products.clone_from(&products);
                        state.last_error = None;
                    } else {
                        debug!(seq = ticket.seq(), "Discarding stale catalog result");
                    }
                }
                self.invalidate_details().await;
                Ok(products)
            }
            Err(e) => {
                warn!(error = %e, "Catalog fetch failed, keeping previous list");
                let err = CatalogError::from(e);
                {
                    let mut state = self.state.write();
                    if state.watermark.is_behind(ticket) {
                        state.last_error = Some(err.clone());
                    } else {
                        debug!(seq = ticket.seq(), "Ignoring failure of a superseded fetch");
                    }
                }
                Err(err)
            }
        }
    }

    /// Fetch one product's details, through the cache.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a cache miss that fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_details(&self, id: ProductId) -> Result<Product, CatalogError> {
        if let Some(product) = self.details.get(&id).await {
            debug!("Cache hit for product details");
            return Ok(product);
        }

        let product = self.backend.get_product_details(id).await?;
        self.details.insert(id, product.clone()).await;
        Ok(product)
    }

    /// Search the backend catalog. A blank query returns the mirror.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.products());
        }
        Ok(self.backend.search_products(query).await?)
    }

    /// Drop every cached product detail.
    pub async fn invalidate_details(&self) {
        self.details.invalidate_all();
        self.details.run_pending_tasks().await;
    }

    // =========================================================================
    // Mirror queries
    // =========================================================================

    /// All mirrored products, in backend order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.state.read().products.clone()
    }

    /// One mirrored product.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.state
            .read()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Mirrored products with anti-waste stock on hand.
    #[must_use]
    pub fn antigaspi_products(&self) -> Vec<Product> {
        self.state
            .read()
            .products
            .iter()
            .filter(|p| stock::has_antigaspi(p))
            .cloned()
            .collect()
    }

    /// Whether the last fetch failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.state.read().last_error.is_some()
    }

    /// The last fetch error, if the last fetch failed.
    #[must_use]
    pub fn last_error(&self) -> Option<CatalogError> {
        self.state.read().last_error.clone()
    }

    // =========================================================================
    // Derived stock and pricing by ID
    // =========================================================================

    /// Total stock, or zero for an unknown product.
    #[must_use]
    pub fn total_stock(&self, id: ProductId) -> Decimal {
        self.with_product(id, stock::total_stock).unwrap_or_default()
    }

    /// Anti-waste stock, or zero for an unknown product.
    #[must_use]
    pub fn antigaspi_stock(&self, id: ProductId) -> Decimal {
        self.with_product(id, stock::antigaspi_stock)
            .unwrap_or_default()
    }

    /// Full-price stock, or zero for an unknown product.
    #[must_use]
    pub fn regular_stock(&self, id: ProductId) -> Decimal {
        self.with_product(id, stock::regular_stock)
            .unwrap_or_default()
    }

    /// Whether the product has anti-waste stock on hand.
    #[must_use]
    pub fn has_antigaspi(&self, id: ProductId) -> bool {
        self.with_product(id, stock::has_antigaspi)
            .unwrap_or_default()
    }

    /// Unit price, or `None` for an unknown product.
    #[must_use]
    pub fn effective_price(&self, id: ProductId, use_antigaspi: bool) -> Option<Money> {
        self.with_product(id, |p| stock::effective_price(p, use_antigaspi))
    }

    /// See [`stock::is_antigaspi_eligible`].
    #[must_use]
    pub fn is_antigaspi_eligible(harvest_date: DateTime<Utc>) -> bool {
        stock::is_antigaspi_eligible(harvest_date, Utc::now())
    }

    fn with_product<T>(&self, id: ProductId, f: impl FnOnce(&Product) -> T) -> Option<T> {
        self.state
            .read()
            .products
            .iter()
            .find(|p| p.id == id)
            .map(f)
    }
}
