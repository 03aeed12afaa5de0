//! Producer stock commands. Need a session with the `producer` role.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use harvest_cart::ProducerInventory;
use harvest_core::{BatchId, ProductId};

use super::CliError;

/// Register a batch. The harvest date defaults to now.
///
/// # Errors
///
/// Returns an error for negative stock, a missing producer session, or a
/// backend refusal.
pub async fn add_batch(
    inventory: &ProducerInventory,
    product: ProductId,
    stock: Decimal,
    harvest_date: Option<NaiveDate>,
) -> Result<(), CliError> {
    let harvested = harvest_date
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map_or_else(Utc::now, |dt| dt.and_utc());

    let batch = inventory.add_batch(product, stock, harvested).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Batch #{} added: {} in stock, harvested {}{}",
            batch.id,
            batch.stock,
            batch.harvest_date.format("%Y-%m-%d"),
            if batch.is_antigaspi { ", antigaspi" } else { "" }
        );
    }
    Ok(())
}

/// Overwrite a batch's stock.
///
/// # Errors
///
/// See [`add_batch`].
pub async fn set_batch(
    inventory: &ProducerInventory,
    batch: BatchId,
    stock: Decimal,
) -> Result<(), CliError> {
    inventory.update_batch_stock(batch, stock).await?;
    tracing::info!(%batch, %stock, "Batch stock set");
    Ok(())
}

/// Overwrite a dry product's stock.
///
/// # Errors
///
/// See [`add_batch`].
pub async fn set_dry(
    inventory: &ProducerInventory,
    product: ProductId,
    stock: Decimal,
) -> Result<(), CliError> {
    inventory.update_dry_stock(product, stock).await?;
    tracing::info!(%product, %stock, "Dry stock set");
    Ok(())
}
