//! HTTP middleware stack for the frontend.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (reuse `x-request-id` or mint one)
//! 4. Client state (cookies -> `RequestContext`, identity resolution)
//!
//! Health and robots routes sit outside the client-state layer so probes
//! never reach the auth backend.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{ContextRejection, Cookies, RequireLogin, Visitor};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::{
    AUTH_COOKIES, CURRENCY_COOKIE, ClientCookies, SESSION_COOKIE, TOKEN_COOKIE, USERNAME_COOKIE,
    clear_auth_cookies, clear_cookie, client_state_middleware, set_cookie,
};
