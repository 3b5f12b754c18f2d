//! Client state carried in cookies.
//!
//! The frontend keeps no server-side session. Four cookies (all `Path=/`,
//! `HttpOnly` and `SameSite=Lax`, sharing one max-age) hold what it needs to
//! know about a visitor:
//!
//! - `shop_session-id`: anonymous session id, minted on first visit
//! - `shop_currency`: display currency
//! - `shop_token`: auth token from login
//! - `shop_username`: display name from login
//!
//! [`client_state_middleware`] turns them into a [`RequestContext`] before
//! any handler runs.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use boutique_core::{CurrencyCode, SessionId};
use secrecy::SecretString;
use tower_sessions::cookie::{Cookie, SameSite, time};
use uuid::Uuid;

use super::request_id::RequestId;
use crate::consolidation::RequestContext;
use crate::error::set_sentry_user;
use crate::state::AppState;

/// Anonymous session id cookie.
pub const SESSION_COOKIE: &str = "shop_session-id";
/// Display currency cookie.
pub const CURRENCY_COOKIE: &str = "shop_currency";
/// Auth token cookie.
pub const TOKEN_COOKIE: &str = "shop_token";
/// Display name cookie.
pub const USERNAME_COOKIE: &str = "shop_username";
/// Cookies cleared when the auth token is dropped.
pub const AUTH_COOKIES: [&str; 2] = [TOKEN_COOKIE, USERNAME_COOKIE];

/// Cookies sent with a request.
#[derive(Debug, Clone, Default)]
pub struct ClientCookies {
    pairs: Vec<(String, String)>,
}

impl ClientCookies {
    /// Parse every `Cookie` header; malformed pairs are skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        Self { pairs }
    }

    /// Value of the first cookie named `name`, if non-empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Names of every cookie sent.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(n, _)| n.as_str())
    }
}

/// `Set-Cookie` value storing `name=value` for `max_age`.
#[must_use]
pub fn set_cookie(name: &str, value: &str, max_age: Duration) -> HeaderValue {
    let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    let cookie = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(seconds))
        .build();
    header_value(&cookie)
}

/// `Set-Cookie` value that deletes `name`.
#[must_use]
pub fn clear_cookie(name: &str) -> HeaderValue {
    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    header_value(&cookie)
}

fn header_value(cookie: &Cookie<'_>) -> HeaderValue {
    // Names and values come from parsed cookies or our own constants.
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Append `Set-Cookie` headers deleting the auth cookies.
pub fn clear_auth_cookies(headers: &mut HeaderMap) {
    for name in AUTH_COOKIES {
        headers.append(header::SET_COOKIE, clear_cookie(name));
    }
}

/// Build the [`RequestContext`] from cookies before the handler runs.
///
/// - Mints a session id when the visitor has none and sets its cookie
/// - Falls back to the configured currency when the cookie is missing or malformed
/// - Resolves the identity through the auth backend when a token is present,
///   clearing the auth cookies if the token was rejected
pub async fn client_state_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let config = state.config();
    let cookies = ClientCookies::from_headers(request.headers());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());

    let (session, minted) = cookies
        .get(SESSION_COOKIE)
        .map_or_else(|| (SessionId::generate(), true), |id| (SessionId::new(id), false));
    let currency = cookies
        .get(CURRENCY_COOKIE)
        .and_then(|code| CurrencyCode::parse(code).ok())
        .unwrap_or_else(|| config.default_currency.clone());
    let token = cookies
        .get(TOKEN_COOKIE)
        .map(|t| SecretString::from(t.to_string()));

    let visitor = state
        .consolidator()
        .resolve_identity(session.clone(), token.as_ref(), cookies.get(USERNAME_COOKIE))
        .await;
    if let Some(username) = visitor.resolution.identity.username() {
        set_sentry_user(username);
    }

    let ctx = RequestContext {
        request_id,
        session: session.clone(),
        identity: visitor.resolution.identity,
        currency,
        token_expired: visitor.resolution.token_expired,
        profile: visitor.profile,
    };
    let token_expired = ctx.token_expired;
    request.extensions_mut().insert(cookies);
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if minted {
        headers.append(
            header::SET_COOKIE,
            set_cookie(SESSION_COOKIE, session.as_str(), config.cookie_max_age),
        );
    }
    // A fresh login in this response replaces the rejected token.
    if token_expired && !sets_cookie(headers, TOKEN_COOKIE) {
        clear_auth_cookies(headers);
    }
    response
}

/// Whether `headers` already carry a `Set-Cookie` for `name`.
fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split_once('=').is_some_and(|(n, _)| n == name))
}
