//! Harvest CLI - browse the catalog, manage a cart, update producer stock.
//!
//! # Usage
//!
//! ```bash
//! # List products with derived stock
//! harvest catalog list
//!
//! # Add 1.5 kg from batch 12 at the anti-waste price
//! harvest cart add 3 1.5 --batch 12 --antigaspi
//!
//! # Place the order (needs a client session)
//! harvest cart checkout --address "3 rue des Lilas" --city Lyon --postal-code 69003
//!
//! # Register a batch harvested three days ago (needs a producer session)
//! harvest stock add-batch 3 40 --harvest-date 2026-10-15
//! ```
//!
//! Configuration comes from `HARVEST_*` environment variables (see
//! [`harvest_cart::config`]). Without `HARVEST_ACCESS_TOKEN` the cart is a
//! guest cart kept in `HARVEST_GUEST_CART_PATH`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvest_core::{BatchId, ProductId};

mod commands;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(author, version, about = "Harvest catalog, cart and stock tools")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Update producer stock
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List every product
    List,
    /// Show one product with its batches
    Show { product: ProductId },
    /// Search products by name
    Search { query: String },
    /// List products with anti-waste stock
    Antigaspi,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show {
        /// Print the lines as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a product
    Add {
        product: ProductId,
        quantity: String,

        /// Take from a specific batch
        #[arg(long)]
        batch: Option<BatchId>,

        /// Buy at the anti-waste price
        #[arg(long)]
        antigaspi: bool,
    },
    /// Remove a line
    Remove { line: String },
    /// Set a line's quantity (0 removes it)
    Update { line: String, quantity: Decimal },
    /// Empty the cart
    Clear,
    /// Place the order
    Checkout {
        #[arg(long)]
        address: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        postal_code: String,

        #[arg(long)]
        phone: Option<String>,

        /// Requested delivery date (YYYY-MM-DD)
        #[arg(long)]
        delivery_date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Register a new batch of a fresh product
    AddBatch {
        product: ProductId,
        stock: Decimal,

        /// Harvest day (YYYY-MM-DD, default: now)
        #[arg(long)]
        harvest_date: Option<NaiveDate>,
    },
    /// Overwrite a batch's stock
    SetBatch { batch: BatchId, stock: Decimal },
    /// Overwrite a dry product's stock
    SetDry { product: ProductId, stock: Decimal },
}

fn init_tracing(json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "harvest_cart=info,harvest_cli=info".into());

    // Logs go to stderr so command output stays pipeable
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let ctx = commands::Context::from_env()?;

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list(&ctx).await?,
            CatalogAction::Show { product } => commands::catalog::show(&ctx, product).await?,
            CatalogAction::Search { query } => commands::catalog::search(&ctx, &query).await?,
            CatalogAction::Antigaspi => commands::catalog::antigaspi(&ctx).await?,
        },
        Commands::Cart { action } => {
            let engine = ctx.cart_engine().await;
            match action {
                CartAction::Show { json } => commands::cart::show(&ctx, &engine, json).await?,
                CartAction::Add {
                    product,
                    quantity,
                    batch,
                    antigaspi,
                } => {
                    commands::cart::add(&ctx, &engine, product, &quantity, batch, antigaspi)
                        .await?;
                }
                CartAction::Remove { line } => commands::cart::remove(&engine, &line).await?,
                CartAction::Update { line, quantity } => {
                    commands::cart::update(&engine, &line, quantity).await?;
                }
                CartAction::Clear => commands::cart::clear(&engine).await?,
                CartAction::Checkout {
                    address,
                    city,
                    postal_code,
                    phone,
                    delivery_date,
                    notes,
                } => {
                    let delivery = harvest_core::DeliveryInfo {
                        address,
                        city,
                        postal_code,
                        phone,
                        delivery_date,
                        notes,
                    };
                    commands::cart::checkout(&engine, &delivery).await?;
                }
            }
        }
        Commands::Stock { action } => {
            let inventory = ctx.producer_inventory();
            match action {
                StockAction::AddBatch {
                    product,
                    stock,
                    harvest_date,
                } => commands::stock::add_batch(&inventory, product, stock, harvest_date).await?,
                StockAction::SetBatch { batch, stock } => {
                    commands::stock::set_batch(&inventory, batch, stock).await?;
                }
                StockAction::SetDry { product, stock } => {
                    commands::stock::set_dry(&inventory, product, stock).await?;
                }
            }
        }
    }
    Ok(())
}
