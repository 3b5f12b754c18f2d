//! Cart wire types.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// One product/quantity pair held by the cart store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A cart as returned by the cart store.
///
/// The store keeps product ids unique per cart, but nothing here relies on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Total number of units across all lines.
#[must_use]
pub fn cart_size(items: &[CartItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}

/// Product ids of every line, in cart order.
pub fn product_ids(items: &[CartItem]) -> impl Iterator<Item = &ProductId> {
    items.iter().map(|item| &item.product_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_size_sums_quantities() {
        let items = [CartItem::new("A", 2), CartItem::new("B", 1), CartItem::new("A", 4)];
        assert_eq!(cart_size(&items), 7);
        assert_eq!(cart_size(&[]), 0);
    }

    #[test]
    fn test_product_ids_keep_order() {
        let items = [CartItem::new("B", 1), CartItem::new("A", 3)];
        let ids: Vec<&str> = product_ids(&items).map(ProductId::as_str).collect();
        assert_eq!(ids, ["B", "A"]);
    }

    #[test]
    fn test_cart_wire_shape() {
        let cart: Cart = serde_json::from_str(
            r#"{"userId":"alice","items":[{"productId":"OLJCESPC7Z","quantity":2}]}"#,
        )
        .unwrap();
        assert_eq!(cart.user_id, "alice");
        assert_eq!(cart.items, [CartItem::new("OLJCESPC7Z", 2)]);

        let empty: Cart = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
