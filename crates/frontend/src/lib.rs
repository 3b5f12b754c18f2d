//! Boutique frontend library.
//!
//! Consolidates the catalog, cart, shipping, checkout and auth backends into
//! per-visitor views. This crate provides the frontend as a library, allowing
//! it to be tested against in-memory backends and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backends;
pub mod config;
pub mod consolidation;
pub mod display;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::app;
pub use state::AppState;
