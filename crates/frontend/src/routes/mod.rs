//! HTTP route handlers for the frontend.
//!
//! Pages are returned as JSON views; form posts answer with `302 Found`
//! redirects. Every path and redirect is prefixed with `BASE_URL`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Priced catalog, currencies, cart size
//! GET  /product/{id}           - Product detail with recommendations
//! GET  /product-meta/{id}      - Raw catalog product
//! GET  /search?q=              - Best-effort catalog search
//! POST /setCurrency            - Set display currency, back to referer
//!
//! # Cart
//! GET  /cart                   - Priced cart with shipping and total
//! POST /cart                   - Add to cart
//! POST /cart/update            - Set quantity of a line
//! POST /cart/empty             - Empty cart
//! POST /cart/checkout          - Place order (requires login)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action, migrates the anonymous cart
//! GET  /register               - Register page
//! POST /register               - Register action
//! GET  /logout                 - Clear every cookie
//! GET  /auth/logout            - Clear auth cookies
//!
//! # Account (requires login)
//! GET  /profile                - Profile of the token holder
//! GET  /orders                 - Order history
//!
//! # Probes (no client state)
//! GET  /_healthz               - Liveness
//! GET  /robots.txt             - Disallow all
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod home;
pub mod products;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use boutique_core::{CurrencyCode, Username};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::consolidation::RequestContext;
use crate::middleware::{client_state_middleware, request_id_middleware};
use crate::state::AppState;

/// Fields shared by every page view.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub request_id: String,
    pub session_id: String,
    pub user_currency: CurrencyCode,
    pub currencies: Vec<CurrencyCode>,
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<Username>,
    pub base_url: String,
}

impl PageMeta {
    #[must_use]
    pub fn new(state: &AppState, ctx: &RequestContext) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            session_id: ctx.session.to_string(),
            user_currency: ctx.currency.clone(),
            currencies: state
                .consolidator()
                .converter()
                .supported_currencies()
                .cloned()
                .collect(),
            logged_in: ctx.identity.is_authenticated(),
            username: ctx.identity.username().cloned(),
            base_url: state.config().base_url.clone(),
        }
    }
}

/// `302 Found` to `location`.
#[must_use]
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::warn!(location, "Redirect target is not a valid header value");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/update", post(cart::update))
        .route("/empty", post(cart::empty))
        .route("/checkout", post(cart::checkout))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/auth/logout", get(auth::auth_logout))
}

/// Create every route that needs the visitor's client state.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/product/{id}", get(products::show))
        .route("/product-meta/{id}", get(products::meta))
        .route("/search", get(products::search))
        .route("/setCurrency", post(home::set_currency))
        .nest("/cart", cart_routes())
        .merge(auth_routes())
        .route("/profile", get(account::profile))
        .route("/orders", get(account::orders))
}

/// Create the liveness and crawler routes.
pub fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/_healthz", get(home::health))
        .route("/robots.txt", get(home::robots))
}

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let pages = page_routes().layer(from_fn_with_state(state.clone(), client_state_middleware));
    let routes = Router::new().merge(pages).merge(probe_routes());

    let base_url = state.config().base_url.clone();
    let routes = if base_url.is_empty() {
        routes
    } else {
        Router::new().nest(&base_url, routes)
    };

    // Trace span outermost so the request id middleware can record on it.
    routes
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = tracing::field::Empty,
                                status = tracing::field::Empty,
                                latency_ms = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                                span.record("status", response.status().as_u16());
                                span.record(
                                    "latency_ms",
                                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                                );
                                DefaultOnResponse::default().on_response(response, latency, span);
                            },
                        ),
                )
                .layer(from_fn(request_id_middleware)),
        )
        .with_state(state)
}
