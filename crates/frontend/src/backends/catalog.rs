//! Catalog backend over HTTP.

use async_trait::async_trait;
use boutique_core::{Product, ProductId};
use tracing::instrument;

use super::{BackendClient, CatalogBackend, UpstreamError};

/// `GET /api/products`, `GET /api/products/{id}`, `GET /api/products/search?q=`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: BackendClient,
}

impl HttpCatalog {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogBackend for HttpCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, UpstreamError> {
        self.client.get_json(&["products"], &[]).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, UpstreamError> {
        self.client.get_json(&["products", id.as_str()], &[]).await
    }

    #[instrument(skip(self))]
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, UpstreamError> {
        self.client
            .get_json(&["products", "search"], &[("q", query)])
            .await
    }
}
