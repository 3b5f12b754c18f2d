//! HTTP behavior of the assembled router.
//!
//! Requests are driven through `tower::ServiceExt::oneshot` against the full
//! middleware stack, with in-memory backends behind it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use boutique_frontend::app;
use boutique_integration_tests::{TestBackends, sample_catalog};
use serde_json::Value;
use tower::ServiceExt;

fn router(backends: &TestBackends) -> Router {
    app(backends.state())
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Probes and client state
// ============================================================================

#[tokio::test]
async fn test_health_check_sets_no_cookies() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends).oneshot(get("/_healthz", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_first_visit_mints_session_cookie() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends).oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("shop_session-id="));

    let body = json(response).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["user_currency"], "USD");
    assert_eq!(body["logged_in"], false);
}

#[tokio::test]
async fn test_returning_visit_keeps_session() {
    let backends = TestBackends::new(sample_catalog());
    backends.cart.put("S", &[("A", 2)]);

    let response = router(&backends)
        .oneshot(get("/", Some("shop_session-id=S; shop_currency=USD")))
        .await
        .unwrap();

    assert!(set_cookies(&response).is_empty());
    let body = json(response).await;
    assert_eq!(body["session_id"], "S");
    assert_eq!(body["cart_size"], 2);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let backends = TestBackends::new(sample_catalog());
    let request = Request::get("/_healthz")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = router(&backends).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_redirects_to_cart() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(post_form("/cart", "shop_session-id=S", "product_id=A&quantity=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/cart");
    assert_eq!(backends.cart.lines("S"), vec![("A".to_string(), 2)]);
}

#[tokio::test]
async fn test_add_to_cart_rejects_bad_quantity() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(post_form("/cart", "shop_session-id=S", "product_id=A&quantity=11"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(backends.cart.lines("S").is_empty());
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(post_form("/cart", "shop_session-id=S", "product_id=ZZZ&quantity=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_page_fails_when_product_is_unavailable() {
    let backends = TestBackends::new(sample_catalog());
    backends.cart.put("S", &[("A", 1), ("B", 1)]);
    backends.catalog.fail_product("A");

    let response = router(&backends)
        .oneshot(get("/cart", Some("shop_session-id=S")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json(response).await;
    assert_eq!(body["status_code"], 502);
}

#[tokio::test]
async fn test_cart_page_shows_total() {
    let backends = TestBackends::new(sample_catalog());
    backends.cart.put("S", &[("A", 3), ("B", 1)]);

    let response = router(&backends)
        .oneshot(get("/cart", Some("shop_session-id=S")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["cart"]["total_cost"]["display"], "$40.00");
    assert_eq!(body["cart"]["cart_size"], 4);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_orders_without_login_redirects_to_login() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(get("/orders", Some("shop_session-id=S")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_expired_token_clears_auth_cookies() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(get(
            "/",
            Some("shop_session-id=S; shop_token=stale; shop_username=alice"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("shop_token=") && c.contains("Max-Age=0")));
    assert!(cookies.iter().any(|c| c.starts_with("shop_username=") && c.contains("Max-Age=0")));

    let body = json(response).await;
    assert_eq!(body["logged_in"], false);
}

#[tokio::test]
async fn test_login_sets_auth_cookies_and_migrates_cart() {
    let backends = TestBackends::new(sample_catalog());
    backends.auth.add_user("alice@example.com", "pw", "alice");
    backends.cart.put("S", &[("B", 1)]);

    let response = router(&backends)
        .oneshot(post_form(
            "/login",
            "shop_session-id=S",
            "email=alice%40example.com&password=pw",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cookies = set_cookies(&response);
    let token = cookies.iter().find(|c| c.starts_with("shop_token=token-alice")).unwrap();
    assert!(token.contains("HttpOnly"));
    assert!(token.contains("SameSite=Lax"));
    assert!(cookies.iter().any(|c| c.starts_with("shop_username=alice")));
    assert_eq!(backends.cart.lines("alice"), vec![("B".to_string(), 1)]);
    assert!(backends.cart.lines("S").is_empty());
}

#[tokio::test]
async fn test_login_with_bad_password_is_unauthorized() {
    let backends = TestBackends::new(sample_catalog());
    backends.auth.add_user("alice@example.com", "pw", "alice");

    let response = router(&backends)
        .oneshot(post_form(
            "/login",
            "shop_session-id=S",
            "email=alice%40example.com&password=wrong",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    let body = json(response).await;
    assert_eq!(body["login_error"], "Invalid email or password");
}

#[tokio::test]
async fn test_logged_in_visitor_sees_own_cart() {
    let backends = TestBackends::new(sample_catalog());
    backends.auth.add_user("alice@example.com", "pw", "alice");
    backends.auth.issue_token("tok", "alice@example.com");
    backends.cart.put("S", &[("A", 1)]);
    backends.cart.put("alice", &[("B", 3)]);

    let response = router(&backends)
        .oneshot(get("/cart", Some("shop_session-id=S; shop_token=tok")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["logged_in"], true);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["cart"]["cart_size"], 3);
}

#[tokio::test]
async fn test_auth_logout_keeps_session() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(get("/auth/logout", Some("shop_session-id=S; shop_token=tok")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("shop_token=")));
    assert!(!cookies.iter().any(|c| c.starts_with("shop_session-id=")));
}

// ============================================================================
// Checkout
// ============================================================================

const ORDER_FORM: &str = "email=alice%40example.com&street_address=1+Main+St&zip_code=62701\
    &city=Springfield&state=IL&country=US&credit_card_number=4432-8015-6152-0454\
    &credit_card_expiration_month=1&credit_card_expiration_year=2099&credit_card_cvv=672";

#[tokio::test]
async fn test_checkout_places_order_in_display_currency() {
    let backends = TestBackends::new(sample_catalog());
    backends.auth.add_user("alice@example.com", "pw", "alice");
    backends.auth.issue_token("tok", "alice@example.com");

    let response = router(&backends)
        .oneshot(post_form(
            "/cart/checkout",
            "shop_session-id=S; shop_token=tok; shop_currency=EUR",
            ORDER_FORM,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let placed = backends.checkout.placed();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].user_id, "alice");
    assert_eq!(placed[0].user_currency, "EUR");

    let body = json(response).await;
    assert_eq!(body["order"]["orderId"], "order-1");
    assert_eq!(body["total_paid"]["currencyCode"], "EUR");
    assert_eq!(body["total_paid"]["units"], 4);
}

#[tokio::test]
async fn test_checkout_without_login_places_nothing() {
    let backends = TestBackends::new(sample_catalog());

    let response = router(&backends)
        .oneshot(post_form("/cart/checkout", "shop_session-id=S", ORDER_FORM))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(backends.checkout.placed().is_empty());
}
