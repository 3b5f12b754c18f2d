//! Cart and checkout handlers.
//!
//! Cart lines are stored by the cart backend under the visitor's identity
//! key: the session id for anonymous visitors, the username once logged in.

use axum::{Form, Json, extract::State, response::Response};
use boutique_core::CartItem;
use serde::Serialize;
use tracing::{info, instrument};

use super::{PageMeta, found};
use crate::consolidation::{CartView, OrderConfirmation, ProductView};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireLogin, Visitor};
use crate::state::AppState;
use crate::validation::{AddToCartForm, PlaceOrderForm, UpdateCartForm};

/// Cart page data.
#[derive(Debug, Serialize)]
pub struct CartPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub cart: CartView,
    pub recommendations: Vec<ProductView>,
    /// Recommendations could not be loaded.
    pub degraded: bool,
}

/// Display the cart priced in the display currency.
///
/// Fails as a whole if any product in the cart cannot be looked up.
#[instrument(skip(state, ctx), fields(identity = %ctx.identity))]
pub async fn show(State(state): State<AppState>, Visitor(ctx): Visitor) -> Result<Json<CartPage>> {
    let consolidator = state.consolidator();
    let cart = consolidator.cart_view(&ctx).await?;

    let in_cart: Vec<_> = cart.items.iter().map(|line| line.product.id.clone()).collect();
    let recommendations = consolidator.recommendations(&ctx, &in_cart).await;

    Ok(Json(CartPage {
        meta: PageMeta::new(&state, &ctx),
        cart,
        degraded: recommendations.is_degraded(),
        recommendations: recommendations.into_value(),
    }))
}

/// Add a product to the cart.
#[instrument(skip(state, ctx, form), fields(identity = %ctx.identity))]
pub async fn add(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let (product_id, quantity) = form.validate()?;

    state
        .consolidator()
        .add_to_cart(&ctx, &product_id, quantity)
        .await
        .map_err(|e| AppError::product_lookup(e, product_id.as_str()))?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );

    Ok(found(&state.url("/cart")))
}

/// Set the quantity of one cart line.
#[instrument(skip(state, ctx, form), fields(identity = %ctx.identity))]
pub async fn update(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let (product_id, quantity) = form
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .consolidator()
        .update_cart_item(&ctx, &CartItem::new(product_id, quantity))
        .await?;

    Ok(found(&state.url("/cart")))
}

/// Remove every line from the cart.
#[instrument(skip(state, ctx), fields(identity = %ctx.identity))]
pub async fn empty(State(state): State<AppState>, Visitor(ctx): Visitor) -> Result<Response> {
    state.consolidator().empty_cart(&ctx).await?;
    Ok(found(&state.url("/")))
}

/// Order confirmation page data.
#[derive(Debug, Serialize)]
pub struct OrderPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    #[serde(flatten)]
    pub confirmation: OrderConfirmation,
    pub recommendations: Vec<ProductView>,
    /// The total paid or the recommendations are approximate or missing.
    pub degraded: bool,
}

/// Place an order for the logged-in visitor.
#[instrument(skip(state, login, form), fields(username = %login.username))]
pub async fn checkout(
    State(state): State<AppState>,
    login: RequireLogin,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Json<OrderPage>> {
    let details = form.validate()?;
    let ctx = login.ctx;
    let consolidator = state.consolidator();

    let confirmation = consolidator.place_order(&ctx, details).await?;
    info!(order_id = %confirmation.value.order.order_id, "Checkout complete");

    let exclude: Vec<_> = confirmation
        .value
        .order
        .items
        .iter()
        .map(|line| line.item.product_id.clone())
        .collect();
    let recommendations = consolidator.recommendations(&ctx, &exclude).await;

    Ok(Json(OrderPage {
        meta: PageMeta::new(&state, &ctx),
        degraded: confirmation.is_degraded() || recommendations.is_degraded(),
        confirmation: confirmation.into_value(),
        recommendations: recommendations.into_value(),
    }))
}
