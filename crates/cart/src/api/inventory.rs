//! Producer stock endpoints.

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use tracing::instrument;

use harvest_core::{Batch, BatchId, NewBatch, ProductId, Session};

use super::HttpBackend;
use super::records::{BatchRecord, StockBody};
use crate::ports::{BackendError, InventoryBackend};

#[async_trait]
impl InventoryBackend for HttpBackend {
    #[instrument(skip(self, session, batch), fields(product_id = %product_id))]
    async fn add_batch(
        &self,
        session: &Session,
        product_id: ProductId,
        batch: &NewBatch,
    ) -> Result<Batch, BackendError> {
        let path = format!("products/{product_id}/batches");
        let record: BatchRecord = self
            .fetch(self.request(Method::POST, &path, Some(session)).json(batch))
            .await?;
        Ok(record.into())
    }

    #[instrument(skip(self, session), fields(batch_id = %batch_id, stock = %stock))]
    async fn update_batch_stock(
        &self,
        session: &Session,
        batch_id: BatchId,
        stock: Decimal,
    ) -> Result<(), BackendError> {
        let path = format!("batches/{batch_id}/stock");
        self.execute(
            self.request(Method::PATCH, &path, Some(session))
                .json(&StockBody { stock }),
        )
        .await
    }

    #[instrument(skip(self, session), fields(product_id = %product_id, stock = %stock))]
    async fn update_dry_stock(
        &self,
        session: &Session,
        product_id: ProductId,
        stock: Decimal,
    ) -> Result<(), BackendError> {
        let path = format!("products/{product_id}/stock");
        self.execute(
            self.request(Method::PATCH, &path, Some(session))
                .json(&StockBody { stock }),
        )
        .await
    }
}
