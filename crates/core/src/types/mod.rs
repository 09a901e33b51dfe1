//! Core types for RocketShoes.
//!
//! This module provides type-safe wrappers for the cart and catalog domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{Cart, CartItemError, LineItem};
pub use id::*;
pub use price::{CurrencyCode, Price, UnknownCurrency};
pub use product::{Product, Stock};
