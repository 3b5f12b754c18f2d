//! Boutique Core - Shared types library.
//!
//! This crate provides the request-independent types used by the boutique
//! frontend and its tests:
//! - [`Money`] - fixed-point currency values with exact arithmetic
//! - [`CurrencyConverter`] - USD-based conversion over an immutable rate table
//! - [`Identity`] - the owner key of a cart or order history
//! - wire types exchanged with the catalog, cart, shipping and checkout backends
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no logging. Everything that talks to a backend lives in
//! `boutique-frontend`.
//!
//! # Modules
//!
//! - [`types`] - money, currency, identity, cart, product and order types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
