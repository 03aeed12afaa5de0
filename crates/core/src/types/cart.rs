//! Cart line and cart types.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{BatchId, ProductId};
use super::price::Money;
use super::quantity::Quantity;

/// Cart line identifier.
///
/// Server lines carry backend IDs; guest lines get a random UUID. Both are
/// opaque strings to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    /// Wrap an existing line ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh ID for a guest line.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line ID.
    pub id: LineId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Specific batch, for fresh products bought from a given harvest.
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    /// Quantity, always positive.
    pub quantity: Quantity,
    /// Unit price at the time the line was priced.
    pub unit_price: Money,
    /// Whether the line is priced at the anti-waste tier.
    #[serde(default)]
    pub is_antigaspi: bool,
}

impl CartLine {
    /// Whether this line refers to the same product and batch.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, batch_id: Option<BatchId>) -> bool {
        self.product_id == product_id && self.batch_id == batch_id
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Where the cart's source of truth lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartMode {
    /// No client session; lines live in the local store.
    #[default]
    Guest,
    /// Valid client session; lines live on the backend.
    Authenticated,
}

impl fmt::Display for CartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => f.write_str("guest"),
            Self::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// A cart: ordered lines plus the mode they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owner mode.
    pub mode: CartMode,
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart in the given mode.
    #[must_use]
    pub const fn empty(mode: CartMode) -> Self {
        Self {
            mode,
            lines: Vec::new(),
        }
    }

    /// Build a cart from existing lines.
    #[must_use]
    pub const fn with_lines(mode: CartMode, lines: Vec<CartLine>) -> Self {
        Self { mode, lines }
    }

    /// `Σ unit_price × quantity`. Display only; checkout uses the backend total.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// `Σ quantity`.
    #[must_use]
    pub fn item_count(&self) -> Decimal {
        self.lines.iter().map(|l| l.quantity.value()).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: &LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }
}
