//! Producer stock management.
//!
//! Wraps the backend's producer endpoints. Every call needs a valid session
//! with the `producer` role. Successful mutations drop the catalog's cached
//! product details so the next lookup sees the new stock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use harvest_core::{Batch, BatchId, NewBatch, ProductId, Role, Session};

use crate::catalog::CatalogStore;
use crate::error::InventoryError;
use crate::ports::{IdentitySource, InventoryBackend};

/// Producer-side stock operations.
pub struct ProducerInventory {
    identity: Arc<dyn IdentitySource>,
    backend: Arc<dyn InventoryBackend>,
    catalog: Option<Arc<CatalogStore>>,
}

impl std::fmt::Debug for ProducerInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerInventory")
            .field("catalog", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}

impl ProducerInventory {
    /// Create the service without a catalog to invalidate.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentitySource>, backend: Arc<dyn InventoryBackend>) -> Self {
        Self {
            identity,
            backend,
            catalog: None,
        }
    }

    /// Invalidate `catalog`'s detail cache after every mutation.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a freshly harvested batch.
    ///
    /// The anti-waste flag is derived from `harvest_date`.
    ///
    /// # Errors
    ///
    /// - [`InventoryError::InvalidStock`] for negative stock (no I/O).
    /// - [`InventoryError::NotAuthenticated`] without a producer session.
    /// - Backend errors.
    #[instrument(skip(self), fields(product_id = %product_id, stock = %stock))]
    pub async fn add_batch(
        &self,
        product_id: ProductId,
        stock: Decimal,
        harvest_date: DateTime<Utc>,
    ) -> Result<Batch, InventoryError> {
        check_stock(stock)?;
        let session = self.producer_session()?;

        let batch = NewBatch::harvested(stock, harvest_date, Utc::now());
        let created = self.backend.add_batch(&session, product_id, &batch).await?;
        info!(batch_id = %created.id, is_antigaspi = created.is_antigaspi, "Batch added");

        self.invalidate().await;
        Ok(created)
    }

    /// Overwrite a batch's stock.
    ///
    /// # Errors
    ///
    /// Same as [`ProducerInventory::add_batch`].
    #[instrument(skip(self), fields(batch_id = %batch_id, stock = %stock))]
    pub async fn update_batch_stock(
        &self,
        batch_id: BatchId,
        stock: Decimal,
    ) -> Result<(), InventoryError> {
        check_stock(stock)?;
        let session = self.producer_session()?;

        self.backend
            .update_batch_stock(&session, batch_id, stock)
            .await?;
        info!("Batch stock updated");

        self.invalidate().await;
        Ok(())
    }

    /// Overwrite a dry product's stock. The backend rejects fresh products.
    ///
    /// # Errors
    ///
    /// Same as [`ProducerInventory::add_batch`].
    #[instrument(skip(self), fields(product_id = %product_id, stock = %stock))]
    pub async fn update_dry_stock(
        &self,
        product_id: ProductId,
        stock: Decimal,
    ) -> Result<(), InventoryError> {
        check_stock(stock)?;
        let session = self.producer_session()?;

        self.backend
            .update_dry_stock(&session, product_id, stock)
            .await?;
        info!("Dry stock updated");

        self.invalidate().await;
        Ok(())
    }

    fn producer_session(&self) -> Result<Session, InventoryError> {
        self.identity
            .current()
            .session_with_role(Role::Producer, Utc::now())
            .cloned()
            .ok_or(InventoryError::NotAuthenticated)
    }

    async fn invalidate(&self) {
        if let Some(catalog) = &self.catalog {
            catalog.invalidate_details().await;
        }
    }
}

fn check_stock(stock: Decimal) -> Result<(), InventoryError> {
    if stock < Decimal::ZERO {
        return Err(InventoryError::InvalidStock(stock));
    }
    Ok(())
}
