//! Wire records for the backend API.
//!
//! Product records arrive with optional `stock` and `batches` fields whose
//! presence depends on the product type. They are normalised into the
//! [`Inventory`] union here, once, so nothing downstream sniffs fields.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use harvest_core::{
    Batch, BatchId, CartLine, DeliveryInfo, Inventory, Money, Product, ProductId, ProductType,
    Quantity,
};

/// Raw product record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default = "default_sale_unit")]
    pub sale_unit: String,
    pub product_type: ProductType,
    /// `None` when the field is absent; `Some(0)` when present but empty.
    #[serde(default, deserialize_with = "present_stock")]
    pub stock: Option<Decimal>,
    #[serde(default)]
    pub batches: Option<Vec<BatchRecord>>,
}

/// Raw batch record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub id: BatchId,
    #[serde(default, deserialize_with = "present_stock")]
    pub stock: Option<Decimal>,
    #[serde(default)]
    pub is_antigaspi: bool,
    pub harvest_date: DateTime<Utc>,
}

fn default_sale_unit() -> String {
    "unit".to_string()
}

/// Deserialize a stock field that is known to be present.
///
/// `null` and `""` are authoritative zero; numbers and numeric strings are
/// taken as-is.
fn present_stock<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let stock = match value {
        None | Some(serde_json::Value::Null) => Decimal::ZERO,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Decimal::ZERO,
        Some(serde_json::Value::String(s)) => parse_decimal(s.trim()).map_err(D::Error::custom)?,
        Some(serde_json::Value::Number(n)) => {
            parse_decimal(&n.to_string()).map_err(D::Error::custom)?
        }
        Some(other) => {
            return Err(D::Error::custom(format!("invalid stock value: {other}")));
        }
    };
    Ok(Some(stock))
}

fn parse_decimal(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw))
}

/// Clamp a stock figure at zero, logging when the backend sent a negative.
fn non_negative(stock: Decimal, what: &str, id: impl std::fmt::Display) -> Decimal {
    if stock < Decimal::ZERO {
        warn!(%stock, %id, "Negative {what} stock from backend, treating as zero");
        Decimal::ZERO
    } else {
        stock
    }
}

impl From<BatchRecord> for Batch {
    fn from(record: BatchRecord) -> Self {
        Self {
            id: record.id,
            stock: non_negative(record.stock.unwrap_or_default(), "batch", record.id),
            is_antigaspi: record.is_antigaspi,
            harvest_date: record.harvest_date,
        }
    }
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        let inventory = match record.product_type {
            // Dry goods never aggregate batches, even if the field is there
            ProductType::Dry => Inventory::Dry {
                stock: non_negative(record.stock.unwrap_or_default(), "product", record.id),
            },
            ProductType::Fresh => Inventory::Fresh {
                batches: record
                    .batches
                    .unwrap_or_default()
                    .into_iter()
                    .map(Batch::from)
                    .collect(),
                declared_stock: record
                    .stock
                    .map(|s| non_negative(s, "product", record.id)),
            },
        };

        Self {
            id: record.id,
            name: record.name,
            price: record.price,
            sale_unit: record.sale_unit,
            inventory,
        }
    }
}

/// Product list responses come either bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductList {
    Bare(Vec<ProductRecord>),
    Wrapped { products: Vec<ProductRecord> },
}

impl ProductList {
    pub fn into_products(self) -> Vec<Product> {
        let records = match self {
            Self::Bare(records) | Self::Wrapped { products: records } => records,
        };
        records.into_iter().map(Product::from).collect()
    }
}

/// Cart response body.
#[derive(Debug, Deserialize)]
pub struct CartResponse {
    #[serde(default, alias = "lines")]
    pub items: Vec<CartLine>,
}

/// `PATCH cart/items/{line}` body.
#[derive(Debug, Serialize)]
pub struct UpdateQuantityBody {
    pub quantity: Quantity,
}

/// Stock overwrite body.
#[derive(Debug, Serialize)]
pub struct StockBody {
    pub stock: Decimal,
}

/// `POST orders` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody<'a> {
    pub delivery_info: &'a DeliveryInfo,
}

/// Error body; backends use either key.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}
