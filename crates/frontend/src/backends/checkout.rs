//! Checkout backend over HTTP.

use async_trait::async_trait;
use boutique_core::{OrderResult, PlaceOrderRequest, PlaceOrderResponse};
use reqwest::Method;
use tracing::instrument;

use super::{BackendClient, CheckoutBackend, UpstreamError};

/// `POST /api/checkout`, `GET /api/checkout/orders/{user}`.
#[derive(Debug, Clone)]
pub struct HttpCheckout {
    client: BackendClient,
}

impl HttpCheckout {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckoutBackend for HttpCheckout {
    #[instrument(skip(self, request), fields(user_id = %request.user_id, currency = %request.user_currency))]
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderResult, UpstreamError> {
        let response: PlaceOrderResponse = self
            .client
            .send_json(Method::POST, &["checkout"], request)
            .await?;
        Ok(response.order)
    }

    #[instrument(skip(self))]
    async fn order_history(&self, user_id: &str) -> Result<Vec<OrderResult>, UpstreamError> {
        self.client
            .get_json(&["checkout", "orders", user_id], &[])
            .await
    }
}
