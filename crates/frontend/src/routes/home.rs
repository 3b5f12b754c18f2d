//! Home page, currency switch and probes.

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::Response,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::{PageMeta, found};
use crate::consolidation::ProductView;
use crate::error::Result;
use crate::middleware::{CURRENCY_COOKIE, Visitor, set_cookie};
use crate::state::AppState;
use crate::validation::SetCurrencyForm;

/// Home page data.
#[derive(Debug, Serialize)]
pub struct HomePage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub products: Vec<ProductView>,
    pub cart_size: u64,
}

/// Display the priced catalog.
#[instrument(skip(state, ctx), fields(currency = %ctx.currency))]
pub async fn home(State(state): State<AppState>, Visitor(ctx): Visitor) -> Result<Json<HomePage>> {
    let consolidator = state.consolidator();
    let (products, cart_size) =
        tokio::try_join!(consolidator.products(&ctx), consolidator.cart_size(&ctx))?;

    Ok(Json(HomePage {
        meta: PageMeta::new(&state, &ctx),
        products,
        cart_size,
    }))
}

/// Store the display currency and go back where the visitor came from.
#[instrument(skip(state, ctx, headers, form))]
pub async fn set_currency(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    headers: HeaderMap,
    Form(form): Form<SetCurrencyForm>,
) -> Result<Response> {
    let currency = form.validate()?;
    debug!(new = %currency, old = %ctx.currency, "Setting currency");

    let referer = headers
        .get(header::REFERER)
        .and_then(|r| r.to_str().ok())
        .filter(|r| !r.is_empty())
        .map_or_else(|| state.url("/"), String::from);

    let mut response = found(&referer);
    response.headers_mut().append(
        header::SET_COOKIE,
        set_cookie(
            CURRENCY_COOKIE,
            currency.as_str(),
            state.config().cookie_max_age,
        ),
    );
    Ok(response)
}

/// Liveness check. Does not touch any backend.
pub async fn health() -> &'static str {
    "ok"
}

/// Keep crawlers out.
pub async fn robots() -> &'static str {
    "User-agent: *\nDisallow: /"
}
