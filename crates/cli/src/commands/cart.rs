//! Cart commands.
//!
//! The cart is a guest cart kept on disk unless a client session is
//! configured, in which case every command goes through the backend.

use rust_decimal::Decimal;
use tracing::warn;

use harvest_cart::CartEngine;
use harvest_core::{BatchId, DeliveryInfo, LineId, ProductId};

use super::{CliError, Context};

/// Print the cart with product names.
///
/// A failed fetch prints the last local snapshot, flagged as stale.
///
/// # Errors
///
/// Returns an error only if JSON output fails.
pub async fn show(ctx: &Context, engine: &CartEngine, json: bool) -> Result<(), CliError> {
    if let Err(e) = engine.fetch_cart().await {
        warn!(error = %e, "Showing last known cart");
    }
    if let Err(e) = ctx.catalog.fetch_all().await {
        warn!(error = %e, "Product names unavailable");
    }

    let views = engine.line_views(&ctx.catalog);
    let snapshot = engine.snapshot();

    #[allow(clippy::print_stdout)]
    {
        if json {
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }

        println!(
            "{} cart{}",
            snapshot.cart.mode,
            if snapshot.stale { " (stale)" } else { "" }
        );
        if views.is_empty() {
            println!("  (empty)");
        }
        for view in &views {
            println!(
                "  {}  {:<30} {:>6} {:<6} x {:>8} = {:>9}{}",
                view.line.id,
                view.product_name.as_deref().unwrap_or("?"),
                view.line.quantity,
                view.sale_unit.as_deref().unwrap_or(""),
                view.line.unit_price,
                view.line_total,
                if view.line.is_antigaspi {
                    "  antigaspi"
                } else {
                    ""
                }
            );
        }
        println!(
            "  items: {}  total: {}",
            engine.item_count(),
            engine.total_price()
        );
    }
    Ok(())
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the product is unknown, the quantity is invalid,
/// or the backend refuses the line.
pub async fn add(
    ctx: &Context,
    engine: &CartEngine,
    product_id: ProductId,
    quantity: &str,
    batch: Option<BatchId>,
    antigaspi: bool,
) -> Result<(), CliError> {
    let product = match ctx.catalog.product_details(product_id).await {
        Ok(product) => product,
        Err(harvest_cart::CatalogError::Backend(harvest_cart::BackendError::NotFound(_))) => {
            return Err(CliError::UnknownProduct(product_id));
        }
        Err(e) => return Err(e.into()),
    };

    let cart = engine.add_line(&product, quantity, batch, antigaspi).await?;
    print_summary(&cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the backend refuses the removal.
pub async fn remove(engine: &CartEngine, line: &str) -> Result<(), CliError> {
    let cart = engine.remove_line(&LineId::from(line)).await?;
    print_summary(&cart);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the line is unknown or the backend refuses.
pub async fn update(engine: &CartEngine, line: &str, quantity: Decimal) -> Result<(), CliError> {
    let cart = engine
        .update_quantity(&LineId::from(line), quantity)
        .await?;
    print_summary(&cart);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart can't be cleared.
pub async fn clear(engine: &CartEngine) -> Result<(), CliError> {
    let cart = engine.clear().await?;
    print_summary(&cart);
    Ok(())
}

/// Place the order.
///
/// # Errors
///
/// Returns an error without a client session or if the backend refuses.
pub async fn checkout(engine: &CartEngine, delivery: &DeliveryInfo) -> Result<(), CliError> {
    let order = engine.checkout(delivery).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Order #{} {} - total {} ({} lines)",
            order.id,
            order.status,
            order.total,
            order.lines.len()
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(cart: &harvest_core::Cart) {
    println!(
        "{} cart: {} lines, {} items, total {}",
        cart.mode,
        cart.lines.len(),
        cart.item_count(),
        cart.total_price()
    );
}
