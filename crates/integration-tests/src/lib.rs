//! Integration tests for the boutique frontend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boutique-integration-tests
//! ```
//!
//! No backend services are needed: every backend trait is implemented here by
//! an in-memory double, and the router is driven with `tower::ServiceExt`.
//!
//! # Test Categories
//!
//! - `consolidation` - cart views, cart migration, identity, order history
//! - `router` - HTTP behavior of the assembled router (cookies, redirects)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::{
    CartItem, CurrencyCode, Money, OrderId, OrderResult, PlaceOrderRequest, Product, ProductId,
    Username,
};
use boutique_frontend::backends::{
    AuthBackend, AuthOutcome, AuthRejection, Backends, CartBackend, CatalogBackend,
    CheckoutBackend, LoginSession, Profile, Registration, ShippingBackend, UpstreamError,
};
use boutique_frontend::config::{BackendAddrs, FrontendConfig, SentryConfig};
use boutique_frontend::state::AppState;
use secrecy::{ExposeSecret, SecretString};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable(backend: &'static str) -> UpstreamError {
    UpstreamError::Status {
        backend,
        status: 503,
        body: "unavailable".to_string(),
    }
}

fn not_found(backend: &'static str) -> UpstreamError {
    UpstreamError::Status {
        backend,
        status: 404,
        body: "not found".to_string(),
    }
}

/// USD amount from whole dollars and cents.
#[must_use]
pub fn usd(dollars: i64, cents: i32) -> Money {
    Money {
        currency_code: CurrencyCode::usd(),
        units: dollars,
        nanos: cents * 10_000_000,
    }
}

/// A catalog product priced in USD.
#[must_use]
pub fn product(id: &str, name: &str, price: Money) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: String::new(),
        picture: String::new(),
        price_usd: price,
        categories: Vec::new(),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Catalog over a fixed product list. Individual products, listing and search
/// can be made to fail.
#[derive(Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
    failing: Mutex<HashSet<ProductId>>,
    failing_list: AtomicBool,
    failing_search: AtomicBool,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Make every lookup of `id` fail with a 503.
    pub fn fail_product(&self, id: &str) {
        lock(&self.failing).insert(ProductId::new(id));
    }

    /// Make listing the catalog fail with a 503.
    pub fn fail_list(&self) {
        self.failing_list.store(true, Ordering::SeqCst);
    }

    /// Make every search fail with a 503.
    pub fn fail_search(&self) {
        self.failing_search.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogBackend for MemoryCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, UpstreamError> {
        if self.failing_list.load(Ordering::SeqCst) {
            return Err(unavailable("catalog"));
        }
        Ok(self.products.clone())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, UpstreamError> {
        if lock(&self.failing).contains(id) {
            return Err(unavailable("catalog"));
        }
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| not_found("catalog"))
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, UpstreamError> {
        if self.failing_search.load(Ordering::SeqCst) {
            return Err(unavailable("catalog"));
        }
        let query = query.to_lowercase();
        Ok(self
            .products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart store keyed by owner. Lines keep their product order.
#[derive(Default)]
pub struct MemoryCart {
    carts: Mutex<HashMap<String, BTreeMap<ProductId, u32>>>,
    failing_adds: Mutex<HashSet<ProductId>>,
}

impl MemoryCart {
    /// Seed the cart of `owner`.
    pub fn put(&self, owner: &str, items: &[(&str, u32)]) {
        let mut carts = lock(&self.carts);
        let cart = carts.entry(owner.to_string()).or_default();
        for (id, quantity) in items {
            *cart.entry(ProductId::new(*id)).or_default() += quantity;
        }
    }

    /// Lines of `owner` as `(product id, quantity)` pairs.
    #[must_use]
    pub fn lines(&self, owner: &str) -> Vec<(String, u32)> {
        lock(&self.carts)
            .get(owner)
            .map(|cart| {
                cart.iter()
                    .map(|(id, quantity)| (id.as_str().to_string(), *quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make every add of `id` fail with a 503.
    pub fn fail_add(&self, id: &str) {
        lock(&self.failing_adds).insert(ProductId::new(id));
    }

    /// Let adds of `id` succeed again.
    pub fn recover_add(&self, id: &str) {
        lock(&self.failing_adds).remove(&ProductId::new(id));
    }
}

#[async_trait]
impl CartBackend for MemoryCart {
    async fn get_cart(&self, owner: &str) -> Result<Vec<CartItem>, UpstreamError> {
        Ok(lock(&self.carts)
            .get(owner)
            .map(|cart| {
                cart.iter()
                    .map(|(id, quantity)| CartItem::new(id.clone(), *quantity))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError> {
        if lock(&self.failing_adds).contains(&item.product_id) {
            return Err(unavailable("cart"));
        }
        *lock(&self.carts)
            .entry(owner.to_string())
            .or_default()
            .entry(item.product_id.clone())
            .or_default() += item.quantity;
        Ok(())
    }

    async fn update_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError> {
        let mut carts = lock(&self.carts);
        let cart = carts.entry(owner.to_string()).or_default();
        if item.quantity == 0 {
            cart.remove(&item.product_id);
        } else {
            cart.insert(item.product_id.clone(), item.quantity);
        }
        Ok(())
    }

    async fn empty_cart(&self, owner: &str) -> Result<(), UpstreamError> {
        lock(&self.carts).remove(owner);
        Ok(())
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Shipping that quotes a flat USD amount for a non-empty cart.
pub struct FlatShipping {
    pub quote: Money,
}

#[async_trait]
impl ShippingBackend for FlatShipping {
    async fn quote(&self, items: &[CartItem]) -> Result<Money, UpstreamError> {
        if items.is_empty() {
            return Ok(Money::zero(self.quote.currency_code.clone()));
        }
        Ok(self.quote.clone())
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Checkout holding stored orders per user; placed orders are recorded.
#[derive(Default)]
pub struct MemoryCheckout {
    orders: Mutex<HashMap<String, Vec<OrderResult>>>,
    placed: Mutex<Vec<PlaceOrderRequest>>,
}

impl MemoryCheckout {
    /// Store a past order for `user_id`.
    pub fn store(&self, user_id: &str, order: OrderResult) {
        lock(&self.orders)
            .entry(user_id.to_string())
            .or_default()
            .push(order);
    }

    /// Every request received by `place_order`.
    #[must_use]
    pub fn placed(&self) -> Vec<PlaceOrderRequest> {
        lock(&self.placed).clone()
    }
}

#[async_trait]
impl CheckoutBackend for MemoryCheckout {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderResult, UpstreamError> {
        let mut placed = lock(&self.placed);
        placed.push(request.clone());
        Ok(OrderResult {
            order_id: OrderId::new(format!("order-{}", placed.len())),
            shipping_tracking_id: "TRACK-1".to_string(),
            shipping_cost: Some(usd(5, 0)),
            shipping_address: Some(request.address.clone()),
            items: Vec::new(),
            user_id: request.user_id.clone(),
            email: request.email.clone(),
            total_cost: Some(usd(5, 0)),
            created_at: None,
            user_currency: Some(request.user_currency.clone()),
        })
    }

    async fn order_history(&self, user_id: &str) -> Result<Vec<OrderResult>, UpstreamError> {
        Ok(lock(&self.orders).get(user_id).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Auth
// =============================================================================

struct Account {
    password: String,
    profile: Profile,
}

/// Auth backend with accounts keyed by email and tokens keyed by value.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, String>>,
    unreachable: AtomicBool,
}

impl MemoryAuth {
    /// Create an account.
    pub fn add_user(&self, email: &str, password: &str, username: &str) {
        lock(&self.accounts).insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                profile: Profile {
                    user_id: format!("id-{username}"),
                    email: email.to_string(),
                    username: username.to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    created_at: String::new(),
                },
            },
        );
    }

    /// Issue `token` for the account of `email` without a login.
    pub fn issue_token(&self, token: &str, email: &str) {
        lock(&self.tokens).insert(token.to_string(), email.to_string());
    }

    /// Make every call fail as if the backend were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), UpstreamError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unavailable("auth"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn login(&self, email: &str, password: &SecretString) -> AuthOutcome<LoginSession> {
        self.check_reachable()?;
        let accounts = lock(&self.accounts);
        let Some(account) = accounts
            .get(email)
            .filter(|a| a.password == password.expose_secret())
        else {
            return Ok(Err(AuthRejection::new("Invalid email or password")));
        };

        let token = format!("token-{}", account.profile.username);
        lock(&self.tokens).insert(token.clone(), email.to_string());
        Ok(Ok(LoginSession {
            token: SecretString::from(token),
            expires_at: i64::MAX,
            username: Username::new(account.profile.username.as_str()),
        }))
    }

    async fn register(&self, registration: &Registration) -> AuthOutcome<()> {
        self.check_reachable()?;
        if lock(&self.accounts).contains_key(&registration.email) {
            return Ok(Err(AuthRejection::new("Email already registered")));
        }
        self.add_user(
            &registration.email,
            registration.password.expose_secret(),
            &registration.username,
        );
        Ok(Ok(()))
    }

    async fn profile(&self, token: &SecretString) -> AuthOutcome<Profile> {
        self.check_reachable()?;
        let email = lock(&self.tokens).get(token.expose_secret()).cloned();
        let profile = email.and_then(|email| {
            lock(&self.accounts)
                .get(&email)
                .map(|account| account.profile.clone())
        });
        Ok(profile.ok_or_else(|| AuthRejection::new("Token expired")))
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Every backend double, kept typed so tests can seed and inspect them.
pub struct TestBackends {
    pub catalog: Arc<MemoryCatalog>,
    pub cart: Arc<MemoryCart>,
    pub shipping: Arc<FlatShipping>,
    pub checkout: Arc<MemoryCheckout>,
    pub auth: Arc<MemoryAuth>,
}

impl TestBackends {
    /// Doubles over `products`, quoting $5.00 shipping.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            catalog: Arc::new(MemoryCatalog::new(products)),
            cart: Arc::new(MemoryCart::default()),
            shipping: Arc::new(FlatShipping { quote: usd(5, 0) }),
            checkout: Arc::new(MemoryCheckout::default()),
            auth: Arc::new(MemoryAuth::default()),
        }
    }

    /// Trait-object view handed to the frontend.
    #[must_use]
    pub fn backends(&self) -> Backends {
        Backends {
            catalog: self.catalog.clone(),
            cart: self.cart.clone(),
            shipping: self.shipping.clone(),
            checkout: self.checkout.clone(),
            auth: self.auth.clone(),
        }
    }

    /// Application state over these doubles with [`test_config`].
    ///
    /// # Panics
    ///
    /// Panics if the test configuration is invalid.
    #[must_use]
    pub fn state(&self) -> AppState {
        AppState::with_backends(test_config(), self.backends()).expect("valid test config")
    }
}

/// Configuration pointing nowhere; backends are injected by the caller.
#[must_use]
pub fn test_config() -> FrontendConfig {
    FrontendConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: String::new(),
        backends: BackendAddrs::gateway("localhost:1"),
        backend_timeout: Duration::from_secs(1),
        cookie_max_age: Duration::from_secs(172_800),
        default_currency: CurrencyCode::usd(),
        exchange_rates: Vec::new(),
        sentry: SentryConfig::default(),
    }
}

/// The two-product catalog most tests use: A at $10.00 and B at $5.00.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        product("A", "Vintage Camera", usd(10, 0)),
        product("B", "Sunglasses", usd(5, 0)),
    ]
}
