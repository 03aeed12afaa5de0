//! Read-only views of the engine state.

use serde::Serialize;

use harvest_core::{Cart, CartLine, Money};

use crate::catalog::CatalogStore;
use crate::error::CartError;

/// Cart plus the engine's health flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Current lines.
    pub cart: Cart,
    /// `true` when the lines are a fallback after a failed fetch.
    pub stale: bool,
    /// Most recent failure, until cleared.
    pub last_error: Option<CartError>,
}

/// A cart line joined with its catalog product, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    /// The line itself.
    #[serde(flatten)]
    pub line: CartLine,
    /// Product name, when the product is in the mirrored catalog.
    pub product_name: Option<String>,
    /// Sale unit, when known.
    pub sale_unit: Option<String>,
    /// `unit_price × quantity`.
    pub line_total: Money,
}

impl CartLineView {
    pub(crate) fn join(line: &CartLine, catalog: &CatalogStore) -> Self {
        let product = catalog.product(line.product_id);
        Self {
            line: line.clone(),
            product_name: product.as_ref().map(|p| p.name.clone()),
            sale_unit: product.map(|p| p.sale_unit),
            line_total: line.line_total(),
        }
    }
}
