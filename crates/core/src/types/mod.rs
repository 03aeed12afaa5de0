//! Core types for Harvest.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod id;
pub mod identity;
pub mod order;
pub mod price;
pub mod product;
pub mod quantity;
pub mod status;

pub use cart::{Cart, CartLine, CartMode, LineId};
pub use id::*;
pub use identity::{Identity, Session};
pub use order::{DeliveryInfo, Order};
pub use price::Money;
pub use product::{Batch, Inventory, NewBatch, Product, ProductType};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
