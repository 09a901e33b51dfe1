//! RocketShoes storefront library.
//!
//! Client-side cart state for the RocketShoes shop: a [`CartStore`] that keeps
//! the shopper's cart, validates quantities against live stock from the
//! catalog API, and persists a snapshot after every change.
//!
//! # Modules
//!
//! - [`cart`] - the cart store and its operations
//! - [`catalog`] - product and stock lookups
//! - [`storage`] - key-value persistence for the cart snapshot
//! - [`notify`] - user-facing failure notifications
//! - [`config`] - environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;

pub use cart::{CART_STORAGE_KEY, CartStore, UpdateProductAmount};
pub use error::{CartError, CartErrorKind, FailureCause};
