//! Derived stock and pricing rules.
//!
//! Every function here is total over [`Inventory`]: dry products never look
//! at batches, fresh products use their declared stock figure when the
//! backend sent one and the batch sum otherwise.
//!
//! # Anti-waste tier
//!
//! Batches harvested at least [`ANTIGASPI_MIN_AGE_DAYS`] days ago are sold at
//! half price. The backend owns the `is_antigaspi` flag on each batch;
//! [`is_antigaspi_eligible`] is the rule it is derived from.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::types::{Batch, Inventory, Money, Product};

/// Minimum batch age, in days, for the anti-waste tier.
pub const ANTIGASPI_MIN_AGE_DAYS: i64 = 2;

/// Whether a batch harvested at `harvest_date` qualifies for the anti-waste
/// tier at `now`. The bound is closed: exactly two days old qualifies.
#[must_use]
pub fn is_antigaspi_eligible(harvest_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(harvest_date) >= Duration::days(ANTIGASPI_MIN_AGE_DAYS)
}

/// Total stock of a product.
#[must_use]
pub fn total_stock(product: &Product) -> Decimal {
    match &product.inventory {
        Inventory::Dry { stock } => *stock,
        Inventory::Fresh {
            declared_stock: Some(stock),
            ..
        } => *stock,
        Inventory::Fresh {
            batches,
            declared_stock: None,
        } => batches.iter().map(|b| b.stock).sum(),
    }
}

/// Stock held in batches flagged for the anti-waste tier.
#[must_use]
pub fn antigaspi_stock(product: &Product) -> Decimal {
    product
        .inventory
        .batches()
        .iter()
        .filter(|b| b.is_antigaspi)
        .map(|b| b.stock)
        .sum()
}

/// Stock sold at full price.
///
/// Floors at zero when a declared stock figure is smaller than the flagged
/// batch stock.
#[must_use]
pub fn regular_stock(product: &Product) -> Decimal {
    (total_stock(product) - antigaspi_stock(product)).max(Decimal::ZERO)
}

/// Whether any anti-waste stock is available.
#[must_use]
pub fn has_antigaspi(product: &Product) -> bool {
    antigaspi_stock(product) > Decimal::ZERO
}

/// Unit price for a product, at the anti-waste tier when requested and
/// available.
#[must_use]
pub fn effective_price(product: &Product, use_antigaspi: bool) -> Money {
    if use_antigaspi && has_antigaspi(product) {
        product.price.half()
    } else {
        product.price
    }
}

/// Batches with stock that qualify for the anti-waste tier at `now`.
pub fn eligible_batches(product: &Product, now: DateTime<Utc>) -> impl Iterator<Item = &Batch> {
    product
        .inventory
        .batches()
        .iter()
        .filter(move |b| b.stock > Decimal::ZERO && b.is_eligible_at(now))
}
