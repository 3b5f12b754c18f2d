//! Checkout wire types.
//!
//! An [`OrderResult`] is owned by the checkout backend. The frontend only
//! reads it to compute display values; every money field is optional because
//! stored orders are not guaranteed to carry all of them.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::CartItem;
use super::id::OrderId;
use super::money::Money;

/// Shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: i32,
}

/// Payment card details.
///
/// Sent to checkout once and never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardInfo {
    pub credit_card_number: String,
    pub credit_card_cvv: i32,
    pub credit_card_expiration_year: i32,
    pub credit_card_expiration_month: i32,
}

impl fmt::Debug for CreditCardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self
            .credit_card_number
            .get(self.credit_card_number.len().saturating_sub(4)..)
            .unwrap_or_default();
        f.debug_struct("CreditCardInfo")
            .field("credit_card_number", &format_args!("****{last4}"))
            .field("credit_card_cvv", &"[REDACTED]")
            .field(
                "credit_card_expiration_year",
                &self.credit_card_expiration_year,
            )
            .field(
                "credit_card_expiration_month",
                &self.credit_card_expiration_month,
            )
            .finish()
    }
}

/// One purchased line. `cost` is the unit price in the order's stored currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item: CartItem,
    #[serde(default)]
    pub cost: Option<Money>,
}

/// A placed order as stored by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: OrderId,
    #[serde(default)]
    pub shipping_tracking_id: String,
    #[serde(default)]
    pub shipping_cost: Option<Money>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub total_cost: Option<Money>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_currency: Option<String>,
}

impl OrderResult {
    /// Creation time, when checkout recorded an RFC 3339 timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Body of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub user_currency: String,
    pub address: Address,
    pub email: String,
    pub credit_card: CreditCardInfo,
}

/// Response of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub order: OrderResult,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_card_debug_is_redacted() {
        let card = CreditCardInfo {
            credit_card_number: "4432801561520454".to_string(),
            credit_card_cvv: 672,
            credit_card_expiration_year: 2030,
            credit_card_expiration_month: 1,
        };
        let debug = format!("{card:?}");
        assert!(!debug.contains("4432801561520454"));
        assert!(!debug.contains("672"));
        assert!(debug.contains("****0454"));
    }

    #[test]
    fn test_sparse_order_deserializes() {
        let order: OrderResult = serde_json::from_str(
            r#"{"orderId":"o-1","items":[{"item":{"productId":"A","quantity":2}}]}"#,
        )
        .unwrap();
        assert_eq!(order.order_id.as_str(), "o-1");
        assert!(order.shipping_cost.is_none());
        assert!(order.total_cost.is_none());
        assert_eq!(order.items.len(), 1);
        assert!(order.items.first().unwrap().cost.is_none());
        assert!(order.user_currency.is_none());
    }

    #[test]
    fn test_created_at_parses_rfc3339() {
        let order: OrderResult = serde_json::from_str(
            r#"{"orderId":"o-1","createdAt":"2024-05-01T12:30:00Z"}"#,
        )
        .unwrap();
        let at = order.created_at_utc().unwrap();
        assert_eq!(at.to_rfc3339(), "2024-05-01T12:30:00+00:00");

        let order = OrderResult {
            created_at: Some("yesterday".to_string()),
            ..order
        };
        assert!(order.created_at_utc().is_none());
    }
}
