//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! harvest catalog list
//! harvest catalog show 3
//! harvest catalog search "pomme de terre"
//! harvest catalog antigaspi
//! ```

use chrono::Utc;

use harvest_core::{Inventory, Product, ProductId, stock};

use super::{CliError, Context};

/// List every product with derived stock.
///
/// # Errors
///
/// Returns an error if the catalog can't be fetched.
pub async fn list(ctx: &Context) -> Result<(), CliError> {
    let products = ctx.catalog.fetch_all().await?;
    print_products(&products);
    Ok(())
}

/// Show one product with its batches.
///
/// # Errors
///
/// Returns an error if the product can't be fetched.
pub async fn show(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    let product = ctx.catalog.product_details(id).await?;
    let now = Utc::now();

    #[allow(clippy::print_stdout)]
    {
        println!("{} (#{})", product.name, product.id);
        println!("  type:      {}", product.product_type());
        println!("  price:     {} / {}", product.price, product.sale_unit);
        if stock::has_antigaspi(&product) {
            println!(
                "  antigaspi: {} / {}",
                stock::effective_price(&product, true),
                product.sale_unit
            );
        }
        println!(
            "  stock:     {} ({} regular, {} antigaspi)",
            stock::total_stock(&product),
            stock::regular_stock(&product),
            stock::antigaspi_stock(&product)
        );

        if let Inventory::Fresh { batches, .. } = &product.inventory {
            println!("  batches:");
            for batch in batches {
                println!(
                    "    #{:<6} {:>8}  harvested {}  {}{}",
                    batch.id,
                    batch.stock,
                    batch.harvest_date.format("%Y-%m-%d"),
                    if batch.is_antigaspi { "antigaspi" } else { "regular" },
                    if batch.is_eligible_at(now) && !batch.is_antigaspi {
                        " (eligible)"
                    } else {
                        ""
                    }
                );
            }
        }
    }
    Ok(())
}

/// Search products by name.
///
/// # Errors
///
/// Returns an error if the search fails.
pub async fn search(ctx: &Context, query: &str) -> Result<(), CliError> {
    let products = ctx.catalog.search(query).await?;
    print_products(&products);
    Ok(())
}

/// List products with anti-waste stock.
///
/// # Errors
///
/// Returns an error if the catalog can't be fetched.
pub async fn antigaspi(ctx: &Context) -> Result<(), CliError> {
    ctx.catalog.fetch_all().await?;
    print_products(&ctx.catalog.antigaspi_products());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products.");
        return;
    }

    for p in products {
        println!(
            "#{:<5} {:<30} {:>8} / {:<6} {:<5} stock {:>8}{}",
            p.id,
            p.name,
            p.price,
            p.sale_unit,
            p.product_type(),
            stock::total_stock(p),
            if stock::has_antigaspi(p) {
                format!("  antigaspi {}", stock::antigaspi_stock(p))
            } else {
                String::new()
            }
        );
    }
}
