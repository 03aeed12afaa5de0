//! Product catalog endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use harvest_core::{Product, ProductId};

use super::HttpBackend;
use super::records::{ProductList, ProductRecord};
use crate::ports::{BackendError, CatalogBackend};

#[async_trait]
impl CatalogBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let list: ProductList = self
            .fetch(self.request(Method::GET, "products", None))
            .await?;
        Ok(list.into_products())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product_details(&self, id: ProductId) -> Result<Product, BackendError> {
        let path = format!("products/{id}");
        let record: ProductRecord = self.fetch(self.request(Method::GET, &path, None)).await?;
        Ok(record.into())
    }

    #[instrument(skip(self))]
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, BackendError> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let path = format!("products/search?q={encoded}");
        let list: ProductList = self.fetch(self.request(Method::GET, &path, None)).await?;
        Ok(list.into_products())
    }
}
