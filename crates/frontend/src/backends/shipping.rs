//! Shipping quote backend over HTTP.

use async_trait::async_trait;
use boutique_core::{CartItem, Money};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{BackendClient, ShippingBackend, UpstreamError};

#[derive(Serialize)]
struct QuoteRequest<'a> {
    items: &'a [CartItem],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    cost_usd: Money,
}

/// `POST /api/shipping/quote`.
#[derive(Debug, Clone)]
pub struct HttpShipping {
    client: BackendClient,
}

impl HttpShipping {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ShippingBackend for HttpShipping {
    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn quote(&self, items: &[CartItem]) -> Result<Money, UpstreamError> {
        let response: QuoteResponse = self
            .client
            .send_json(Method::POST, &["shipping", "quote"], &QuoteRequest { items })
            .await?;
        Ok(response.cost_usd)
    }
}
