//! Core types for the boutique frontend.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! consolidation layer works with.

pub mod cart;
pub mod currency;
pub mod degraded;
pub mod id;
pub mod identity;
pub mod money;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, cart_size, product_ids};
pub use currency::{BASE_CURRENCY, CurrencyCode, CurrencyCodeError, CurrencyConverter, RateError};
pub use degraded::Degraded;
pub use id::*;
pub use identity::{Identity, Resolution, TokenCheck};
pub use money::{Money, MoneyError, NANOS_PER_UNIT};
pub use order::{Address, CreditCardInfo, OrderItem, OrderResult, PlaceOrderRequest, PlaceOrderResponse};
pub use product::Product;
