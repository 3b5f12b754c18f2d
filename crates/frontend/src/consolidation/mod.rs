//! Request-scoped consolidation of backend data.
//!
//! # Architecture
//!
//! The [`Consolidator`] composes the backends behind their traits with the
//! process-wide rate table:
//!
//! - identity resolution and cart migration on login ([`identity`])
//! - cart, catalog, checkout and order-history views ([`aggregate`])
//!
//! Every operation takes a [`RequestContext`]. Operations that must not show
//! partial data return `Result<_, ConsolidationError>`; best-effort ones
//! return [`boutique_core::Degraded`] and log what they dropped at `warn`.
//!
//! Each backend call is attempted once. When the inbound request is dropped,
//! the in-flight futures (and their HTTP calls) are dropped with it.

pub mod aggregate;
mod context;
mod error;
pub mod identity;

use std::sync::Arc;

use boutique_core::CurrencyConverter;

pub use aggregate::{
    CartLineView, CartView, OrderConfirmation, OrderDetails, OrderLineView, OrderView, ProductView,
};
pub use context::RequestContext;
pub use error::ConsolidationError;
pub use identity::{MigrationReport, ResolvedVisitor};

use crate::backends::Backends;

/// Entry point of the consolidation layer. Cheap to clone.
#[derive(Clone)]
pub struct Consolidator {
    backends: Backends,
    converter: Arc<CurrencyConverter>,
}

impl Consolidator {
    #[must_use]
    pub const fn new(backends: Backends, converter: Arc<CurrencyConverter>) -> Self {
        Self {
            backends,
            converter,
        }
    }

    #[must_use]
    pub const fn backends(&self) -> &Backends {
        &self.backends
    }

    #[must_use]
    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }
}
