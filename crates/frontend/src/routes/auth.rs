//! Login, registration and logout handlers.
//!
//! Login stores the auth token and the username in cookies and moves the
//! anonymous cart into the user's cart. Nothing about the login is kept
//! server-side; every later request re-checks the token.

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{PageMeta, found};
use crate::backends::Registration;
use crate::error::Result;
use crate::middleware::{
    Cookies, TOKEN_COOKIE, USERNAME_COOKIE, Visitor, clear_auth_cookies, clear_cookie, set_cookie,
};
use crate::state::AppState;

/// Login page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub registered: Option<String>,
}

/// Login page data.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Display the login page.
#[instrument(skip(state, ctx))]
pub async fn login_page(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Query(query): Query<LoginQuery>,
) -> Json<LoginPage> {
    Json(LoginPage {
        meta: PageMeta::new(&state, &ctx),
        success_message: (query.registered.as_deref() == Some("true"))
            .then_some("Registration successful! Please log in."),
        login_error: None,
        email: None,
    })
}

/// Log in and migrate the anonymous cart.
///
/// A rejected login answers `401` with the login page and the reason.
#[instrument(skip(state, ctx, form), fields(request_id = %ctx.request_id))]
pub async fn login(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let password = SecretString::from(form.password);
    let outcome = state
        .consolidator()
        .login(&ctx, &form.email, &password)
        .await?;

    let (session, migration) = match outcome {
        Ok(done) => done,
        Err(rejection) => {
            let page = LoginPage {
                meta: PageMeta::new(&state, &ctx),
                success_message: None,
                login_error: Some(rejection.message),
                email: Some(form.email),
            };
            return Ok((StatusCode::UNAUTHORIZED, Json(page)).into_response());
        }
    };
    info!(
        username = %session.username,
        items_moved = migration.value.items_moved,
        migration_degraded = migration.is_degraded(),
        "Login complete"
    );

    let max_age = state.config().cookie_max_age;
    let mut response = found(&state.url("/"));
    let headers = response.headers_mut();
    headers.append(
        header::SET_COOKIE,
        set_cookie(TOKEN_COOKIE, session.token.expose_secret(), max_age),
    );
    headers.append(
        header::SET_COOKIE,
        set_cookie(USERNAME_COOKIE, session.username.as_str(), max_age),
    );
    Ok(response)
}

/// Register page data.
#[derive(Debug, Serialize)]
pub struct RegisterPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_error: Option<String>,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Display the registration page.
#[instrument(skip(state, ctx))]
pub async fn register_page(State(state): State<AppState>, Visitor(ctx): Visitor) -> Json<RegisterPage> {
    Json(RegisterPage {
        meta: PageMeta::new(&state, &ctx),
        register_error: None,
        email: String::new(),
        username: String::new(),
        first_name: String::new(),
        last_name: String::new(),
    })
}

/// Create an account, then send the visitor to the login page.
///
/// A rejected registration answers `400` with the form echoed back (without
/// the password).
#[instrument(skip(state, ctx, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    Visitor(ctx): Visitor,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let registration = Registration {
        email: form.email,
        username: form.username,
        password: SecretString::from(form.password),
        first_name: form.first_name,
        last_name: form.last_name,
    };

    match state.consolidator().register(&registration).await? {
        Ok(()) => Ok(found(&state.url("/login?registered=true"))),
        Err(rejection) => {
            let page = RegisterPage {
                meta: PageMeta::new(&state, &ctx),
                register_error: Some(rejection.message),
                email: registration.email,
                username: registration.username,
                first_name: registration.first_name,
                last_name: registration.last_name,
            };
            Ok((StatusCode::BAD_REQUEST, Json(page)).into_response())
        }
    }
}

/// Clear every cookie the visitor sent, including the session id.
#[instrument(skip(state, cookies))]
pub async fn logout(State(state): State<AppState>, Cookies(cookies): Cookies) -> Response {
    let mut response = found(&state.url("/"));
    let headers = response.headers_mut();
    for name in cookies.names() {
        headers.append(header::SET_COOKIE, clear_cookie(name));
    }
    response
}

/// Drop the auth token and username but keep the session and currency.
#[instrument(skip(state))]
pub async fn auth_logout(State(state): State<AppState>) -> Response {
    let mut response = found(&state.url("/"));
    clear_auth_cookies(response.headers_mut());
    response
}
