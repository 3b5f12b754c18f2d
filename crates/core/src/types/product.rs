//! Catalog wire types.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::Money;

/// A catalog product. Prices are always stored in USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: String,
    pub price_usd: Money,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_wire_shape() {
        let product: Product = serde_json::from_str(
            r#"{
                "id": "OLJCESPC7Z",
                "name": "Sunglasses",
                "picture": "/static/img/products/sunglasses.jpg",
                "priceUsd": {"currencyCode": "USD", "units": 19, "nanos": 990000000},
                "categories": ["accessories"]
            }"#,
        )
        .unwrap();
        assert_eq!(product.id.as_str(), "OLJCESPC7Z");
        assert!(product.description.is_empty());
        assert_eq!(product.price_usd.units, 19);
        assert_eq!(product.price_usd.nanos, 990_000_000);
        assert_eq!(product.categories, ["accessories"]);
    }
}
