//! Harvest Core - Shared domain types library.
//!
//! This crate provides the types used across all Harvest components:
//! - `cart` - Catalog store, cart engine and backend client
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Anything time-dependent takes `now` as an argument.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, quantities, products, carts, identity
//! - [`stock`] - Derived stock and anti-waste pricing rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod stock;
pub mod types;

pub use types::*;
