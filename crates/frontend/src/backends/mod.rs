//! Typed clients for the backend services.
//!
//! # Architecture
//!
//! - One trait per backend (catalog, cart, shipping, checkout, auth); the
//!   consolidation layer depends only on these traits, so tests can swap in
//!   in-memory doubles
//! - HTTP implementations share one pooled `reqwest::Client` whose timeout
//!   bounds every outbound call
//! - No retries and no caching: every call is attempted once and reads fresh
//!   backend state
//!
//! # Example
//!
//! ```rust,ignore
//! use boutique_frontend::backends::Backends;
//!
//! let backends = Backends::http(&config.backends, config.backend_timeout)?;
//! let products = backends.catalog.list_products().await?;
//! ```

mod auth;
mod cart;
mod catalog;
mod checkout;
mod http;
mod shipping;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::{
    CartItem, Money, OrderResult, PlaceOrderRequest, Product, ProductId, Username,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::HttpAuth;
pub use cart::HttpCart;
pub use catalog::HttpCatalog;
pub use checkout::HttpCheckout;
pub use http::{BackendClient, BackendInitError};
pub use shipping::HttpShipping;

use crate::config::BackendAddrs;

/// Errors from a single backend call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or timed out.
    #[error("{backend}: request failed: {source}")]
    Transport {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("{backend}: status {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("{backend}: invalid response: {message}")]
    Decode {
        backend: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Name of the backend that failed.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Transport { backend, .. }
            | Self::Status { backend, .. }
            | Self::Decode { backend, .. } => backend,
        }
    }

    /// Upstream status code, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A negative answer from the auth backend (bad credentials, expired token,
/// duplicate user). Shown to the visitor as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct AuthRejection {
    pub message: String,
}

impl AuthRejection {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of an auth call: the backend was reachable and said yes or no.
pub type AuthOutcome<T> = Result<Result<T, AuthRejection>, UpstreamError>;

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: SecretString,
    /// Unix timestamp after which the token is rejected.
    pub expires_at: i64,
    pub username: Username,
}

/// A registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
}

/// Profile of a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub created_at: String,
}

/// Product catalog.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, UpstreamError>;
    async fn get_product(&self, id: &ProductId) -> Result<Product, UpstreamError>;
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, UpstreamError>;
}

/// Cart store, addressed by owner key (session id or username).
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn get_cart(&self, owner: &str) -> Result<Vec<CartItem>, UpstreamError>;
    /// Add `item.quantity` to the owner's line for `item.product_id`.
    async fn add_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError>;
    /// Set the owner's line for `item.product_id` to `item.quantity`.
    async fn update_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError>;
    async fn empty_cart(&self, owner: &str) -> Result<(), UpstreamError>;
}

/// Shipping quotes. Quotes are in USD.
#[async_trait]
pub trait ShippingBackend: Send + Sync {
    async fn quote(&self, items: &[CartItem]) -> Result<Money, UpstreamError>;
}

/// Order placement and history.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderResult, UpstreamError>;
    async fn order_history(&self, user_id: &str) -> Result<Vec<OrderResult>, UpstreamError>;
}

/// Accounts and tokens.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, email: &str, password: &SecretString) -> AuthOutcome<LoginSession>;
    async fn register(&self, registration: &Registration) -> AuthOutcome<()>;
    async fn profile(&self, token: &SecretString) -> AuthOutcome<Profile>;
}

/// Every backend the frontend consumes.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogBackend>,
    pub cart: Arc<dyn CartBackend>,
    pub shipping: Arc<dyn ShippingBackend>,
    pub checkout: Arc<dyn CheckoutBackend>,
    pub auth: Arc<dyn AuthBackend>,
}

impl Backends {
    /// HTTP clients for every backend, sharing one connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or an address is
    /// not a valid `host:port`.
    pub fn http(addrs: &BackendAddrs, timeout: Duration) -> Result<Self, BackendInitError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            catalog: Arc::new(HttpCatalog::new(BackendClient::new(
                "catalog",
                client.clone(),
                &addrs.catalog,
            )?)),
            cart: Arc::new(HttpCart::new(BackendClient::new(
                "cart",
                client.clone(),
                &addrs.cart,
            )?)),
            shipping: Arc::new(HttpShipping::new(BackendClient::new(
                "shipping",
                client.clone(),
                &addrs.shipping,
            )?)),
            checkout: Arc::new(HttpCheckout::new(BackendClient::new(
                "checkout",
                client.clone(),
                &addrs.checkout,
            )?)),
            auth: Arc::new(HttpAuth::new(BackendClient::new(
                "auth",
                client,
                &addrs.auth,
            )?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Status {
            backend: "cart",
            status: 503,
            body: "redis down".to_string(),
        };
        assert_eq!(err.to_string(), "cart: status 503: redis down");
        assert_eq!(err.backend(), "cart");
        assert_eq!(err.status(), Some(503));

        let err = UpstreamError::Decode {
            backend: "catalog",
            message: "expected array".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_http_backends_reject_bad_address() {
        let mut addrs = BackendAddrs::gateway("gateway:8080");
        addrs.cart = "not a host".to_string();
        assert!(Backends::http(&addrs, Duration::from_secs(1)).is_err());
        assert!(Backends::http(&BackendAddrs::gateway("gateway:8080"), Duration::from_secs(1)).is_ok());
    }
}
