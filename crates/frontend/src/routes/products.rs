//! Product detail and search handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use boutique_core::{Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::PageMeta;
use crate::consolidation::ProductView;
use crate::error::{AppError, Result};
use crate::middleware::Visitor;
use crate::state::AppState;

/// Product page data.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub product: ProductView,
    pub cart_size: u64,
    pub recommendations: Vec<ProductView>,
    /// Recommendations could not be loaded.
    pub degraded: bool,
}

/// Display a product with its price in the display currency.
#[instrument(skip(state, ctx), fields(currency = %ctx.currency))]
pub async fn show(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Path(id): Path<String>,
) -> Result<Json<ProductPage>> {
    let consolidator = state.consolidator();
    let product_id = ProductId::new(id.as_str());

    let (product, cart_size) = tokio::try_join!(
        async {
            consolidator
                .product(&ctx, &product_id)
                .await
                .map_err(|e| AppError::product_lookup(e, &id))
        },
        async { consolidator.cart_size(&ctx).await.map_err(AppError::from) },
    )?;
    let recommendations = consolidator
        .recommendations(&ctx, std::slice::from_ref(&product_id))
        .await;

    Ok(Json(ProductPage {
        meta: PageMeta::new(&state, &ctx),
        product,
        cart_size,
        degraded: recommendations.is_degraded(),
        recommendations: recommendations.into_value(),
    }))
}

/// Return the catalog's own JSON for one product.
#[instrument(skip(state))]
pub async fn meta(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    state
        .consolidator()
        .raw_product(&ProductId::new(id.as_str()))
        .await
        .map(Json)
        .map_err(|e| AppError::product_lookup(e, &id))
}

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search results page data.
#[derive(Debug, Serialize)]
pub struct SearchPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub query: String,
    pub products: Vec<ProductView>,
    pub result_count: usize,
    pub cart_size: u64,
    /// The search backend failed and the results are empty.
    pub degraded: bool,
}

/// Search the catalog. A failing search shows no results instead of an error.
#[instrument(skip(state, ctx, query), fields(q = %query.q))]
pub async fn search(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchPage>> {
    let consolidator = state.consolidator();
    let (results, cart_size) = tokio::join!(
        consolidator.search(&ctx, &query.q),
        consolidator.cart_size(&ctx)
    );
    let cart_size = cart_size?;
    let degraded = results.is_degraded();
    let products = results.into_value();

    Ok(Json(SearchPage {
        meta: PageMeta::new(&state, &ctx),
        result_count: products.len(),
        products,
        query: query.q,
        cart_size,
        degraded,
    }))
}
