//! Money formatting for visitors.

use boutique_core::{Money, NANOS_PER_UNIT};
use serde::Serialize;

/// Currency symbol shown in front of an amount; `$` when unknown.
#[must_use]
pub fn currency_symbol(code: &str) -> &'static str {
    match code {
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "TRY" => "₺",
        _ => "$",
    }
}

/// Format money as symbol, units and two decimals (`$19.99`).
///
/// Digits past the cent are dropped, not rounded.
#[must_use]
pub fn render_money(money: &Money) -> String {
    let cents = (money.nanos / (NANOS_PER_UNIT / 100)).unsigned_abs();
    let sign = if money.is_negative() { "-" } else { "" };
    format!(
        "{sign}{}{}.{cents:02}",
        currency_symbol(money.currency_code.as_str()),
        money.units.unsigned_abs()
    )
}

/// A money value with its display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Price {
    #[serde(flatten)]
    pub money: Money,
    pub display: String,
}

impl From<Money> for Price {
    fn from(money: Money) -> Self {
        let display = render_money(&money);
        Self { money, display }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boutique_core::CurrencyCode;

    fn money(code: &str, units: i64, nanos: i32) -> Money {
        Money::new(CurrencyCode::from(code), units, nanos).unwrap()
    }

    #[test]
    fn test_render_money() {
        assert_eq!(render_money(&money("USD", 19, 990_000_000)), "$19.99");
        assert_eq!(render_money(&money("EUR", 9, 200_000_000)), "€9.20");
        assert_eq!(render_money(&money("GBP", 0, 5_000_000)), "£0.00");
        assert_eq!(render_money(&money("JPY", 3094, 0)), "¥3094.00");
        assert_eq!(render_money(&money("XXX", 1, 0)), "$1.00");
    }

    #[test]
    fn test_render_negative_money() {
        assert_eq!(render_money(&money("USD", -3, -750_000_000)), "-$3.75");
        assert_eq!(render_money(&money("USD", 0, -500_000_000)), "-$0.50");
    }

    #[test]
    fn test_price_serializes_flat() {
        let json = serde_json::to_value(Price::from(money("CAD", 5, 0))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"currencyCode": "CAD", "units": 5, "nanos": 0, "display": "$5.00"})
        );
    }
}
