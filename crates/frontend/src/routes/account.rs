//! Account pages for logged-in visitors.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use super::{PageMeta, found};
use crate::backends::Profile;
use crate::consolidation::OrderView;
use crate::error::Result;
use crate::middleware::{RequireLogin, Visitor};
use crate::state::AppState;

/// Profile page data.
#[derive(Debug, Serialize)]
pub struct ProfilePage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub profile: Profile,
}

/// Display the profile of the token holder.
///
/// The profile comes from the token check done for this request. Without a
/// valid token the visitor is sent to the login page; a rejected token has
/// its cookies cleared by the client-state layer.
#[instrument(skip(state, ctx), fields(identity = %ctx.identity))]
pub async fn profile(State(state): State<AppState>, Visitor(ctx): Visitor) -> Response {
    match &ctx.profile {
        Some(profile) => Json(ProfilePage {
            meta: PageMeta::new(&state, &ctx),
            profile: profile.clone(),
        })
        .into_response(),
        None => found(&state.url("/login")),
    }
}

/// Order history page data.
#[derive(Debug, Serialize)]
pub struct OrdersPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub orders: Vec<OrderView>,
    /// Some names or prices could not be resolved and show fallbacks.
    pub degraded: bool,
}

/// Display every past order of the logged-in visitor.
#[instrument(skip(state, login), fields(username = %login.username))]
pub async fn orders(State(state): State<AppState>, login: RequireLogin) -> Result<Json<OrdersPage>> {
    let ctx = login.ctx;
    let history = state
        .consolidator()
        .order_history(&ctx, login.username.as_str())
        .await?;

    Ok(Json(OrdersPage {
        meta: PageMeta::new(&state, &ctx),
        degraded: history.is_degraded(),
        orders: history.into_value(),
    }))
}
