//! Catalog product and batch types.
//!
//! A product is either *fresh* (stock lives in harvested batches) or *dry*
//! (a single stock figure). The variant decides how stock is derived; see
//! [`crate::stock`].

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{BatchId, ProductId};
use super::price::Money;

/// Kind of product, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Perishable produce tracked per harvested batch.
    Fresh,
    /// Shelf-stable goods tracked by a single stock figure.
    Dry,
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fresh => "fresh",
            Self::Dry => "dry",
        })
    }
}

/// A harvested lot of a fresh product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Backend batch ID.
    pub id: BatchId,
    /// Units remaining in this batch. Never negative.
    pub stock: Decimal,
    /// Whether the backend sells this batch at the anti-waste tier.
    pub is_antigaspi: bool,
    /// When the batch was harvested.
    pub harvest_date: DateTime<Utc>,
}

impl Batch {
    /// Whether this batch is old enough for the anti-waste tier at `now`.
    #[must_use]
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        crate::stock::is_antigaspi_eligible(self.harvest_date, now)
    }
}

/// Stock-holding shape of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "productType", rename_all = "lowercase")]
pub enum Inventory {
    /// Stock is held in batches.
    Fresh {
        /// Harvested batches, oldest first as returned by the backend.
        batches: Vec<Batch>,
        /// Stock figure reported alongside the batches, if any. When present
        /// it overrides the batch sum.
        #[serde(default, rename = "declaredStock", skip_serializing_if = "Option::is_none")]
        declared_stock: Option<Decimal>,
    },
    /// Stock is a single figure.
    Dry {
        /// Units in stock.
        stock: Decimal,
    },
}

impl Inventory {
    /// The product type this inventory shape belongs to.
    #[must_use]
    pub const fn product_type(&self) -> ProductType {
        match self {
            Self::Fresh { .. } => ProductType::Fresh,
            Self::Dry { .. } => ProductType::Dry,
        }
    }

    /// Batches of a fresh product; empty for dry products.
    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        match self {
            Self::Fresh { batches, .. } => batches,
            Self::Dry { .. } => &[],
        }
    }
}

/// A catalog product mirrored from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Full unit price.
    pub price: Money,
    /// Unit the price applies to (e.g. "kg", "piece", "bunch").
    pub sale_unit: String,
    /// Stock-holding shape.
    #[serde(flatten)]
    pub inventory: Inventory,
}

impl Product {
    /// The product type.
    #[must_use]
    pub const fn product_type(&self) -> ProductType {
        self.inventory.product_type()
    }

    /// Find a batch of this product by ID.
    #[must_use]
    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.inventory.batches().iter().find(|b| b.id == batch_id)
    }
}

/// Input for registering a new batch of a fresh product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    /// Units harvested.
    pub stock: Decimal,
    /// Harvest timestamp.
    pub harvest_date: DateTime<Utc>,
    /// Anti-waste flag, derived from the harvest date when the batch is built.
    pub is_antigaspi: bool,
}

impl NewBatch {
    /// Build a batch input, deriving the anti-waste flag at `now`.
    #[must_use]
    pub fn harvested(stock: Decimal, harvest_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            stock,
            harvest_date,
            is_antigaspi: crate::stock::is_antigaspi_eligible(harvest_date, now),
        }
    }
}
