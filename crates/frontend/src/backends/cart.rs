//! Cart store backend over HTTP.

use async_trait::async_trait;
use boutique_core::{Cart, CartItem};
use reqwest::Method;
use tracing::instrument;

use super::{BackendClient, CartBackend, UpstreamError};

/// `/api/cart/{owner}` and its `items` sub-resources.
#[derive(Debug, Clone)]
pub struct HttpCart {
    client: BackendClient,
}

impl HttpCart {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CartBackend for HttpCart {
    #[instrument(skip(self))]
    async fn get_cart(&self, owner: &str) -> Result<Vec<CartItem>, UpstreamError> {
        let cart: Cart = self.client.get_json(&["cart", owner], &[]).await?;
        Ok(cart.items)
    }

    #[instrument(skip(self), fields(product_id = %item.product_id, quantity = item.quantity))]
    async fn add_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError> {
        self.client
            .send_json_unit(Method::POST, &["cart", owner, "items"], item)
            .await
    }

    #[instrument(skip(self), fields(product_id = %item.product_id, quantity = item.quantity))]
    async fn update_item(&self, owner: &str, item: &CartItem) -> Result<(), UpstreamError> {
        self.client
            .send_json_unit(
                Method::PUT,
                &["cart", owner, "items", item.product_id.as_str()],
                item,
            )
            .await
    }

    #[instrument(skip(self))]
    async fn empty_cart(&self, owner: &str) -> Result<(), UpstreamError> {
        self.client
            .send(self.client.request(Method::DELETE, &["cart", owner]))
            .await?;
        Ok(())
    }
}
