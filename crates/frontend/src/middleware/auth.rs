//! Extractors for the visitor's request context and cookies.
//!
//! `Visitor` and `RequireLogin` read the [`RequestContext`] built by the
//! client-state middleware.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use boutique_core::Username;

use super::session::ClientCookies;
use crate::consolidation::RequestContext;
use crate::routes::found;
use crate::state::AppState;

/// Extractor for the current visitor, anonymous or logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Visitor(ctx): Visitor) -> impl IntoResponse {
///     format!("Hello, {}!", ctx.identity)
/// }
/// ```
pub struct Visitor(pub RequestContext);

/// Extractor that requires a logged-in visitor.
///
/// If the visitor is anonymous (or their token was just rejected), returns a
/// redirect to the login page.
pub struct RequireLogin {
    pub ctx: RequestContext,
    pub username: Username,
}

/// Error returned when the request context is unavailable or login is required.
#[derive(Debug)]
pub enum ContextRejection {
    /// Redirect to the login page.
    RedirectToLogin(String),
    /// The client-state middleware did not run for this route.
    Missing,
}

impl IntoResponse for ContextRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => found(&location),
            Self::Missing => {
                tracing::error!("Request context missing; is the client-state layer installed?");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for Visitor {
    type Rejection = ContextRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(Self)
            .ok_or(ContextRejection::Missing)
    }
}

impl FromRequestParts<AppState> for RequireLogin {
    type Rejection = ContextRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Visitor(ctx) = Visitor::from_request_parts(parts, state).await?;
        let username = ctx
            .identity
            .username()
            .cloned()
            .ok_or_else(|| ContextRejection::RedirectToLogin(state.url("/login")))?;
        Ok(Self { ctx, username })
    }
}

/// Extractor for the raw cookies sent with the request.
pub struct Cookies(pub ClientCookies);

impl<S> FromRequestParts<S> for Cookies
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .extensions
            .get::<ClientCookies>()
            .cloned()
            .unwrap_or_else(|| ClientCookies::from_headers(&parts.headers));
        Ok(Self(cookies))
    }
}
