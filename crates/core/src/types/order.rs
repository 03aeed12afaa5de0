//! Checkout input and order types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::cart::CartLine;
use super::id::OrderId;
use super::price::Money;
use super::status::OrderStatus;

/// Delivery details submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Requested delivery date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    /// Free-form notes for the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An order created by the backend at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend order ID.
    pub id: OrderId,
    /// Order status.
    #[serde(default)]
    pub status: OrderStatus,
    /// Backend-computed total. Authoritative over any client-side sum.
    pub total: Money,
    /// Ordered lines, as priced by the backend.
    #[serde(default, alias = "items")]
    pub lines: Vec<CartLine>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
