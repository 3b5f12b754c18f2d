//! Fixed-point money representation.
//!
//! A [`Money`] value is `units + nanos × 10⁻⁹` in its currency. Arithmetic is
//! carried out on the total number of nanos in an `i128`, so no operation ever
//! goes through floating point.
//!
//! ## Invariants
//!
//! - `nanos` is within `-999_999_999..=999_999_999`
//! - `units` and `nanos` have the same sign when both are non-zero
//! - values are only combined or compared within one currency
//!
//! ## Examples
//!
//! ```
//! use boutique_core::{CurrencyCode, Money};
//!
//! let price = Money::new(CurrencyCode::usd(), 10, 0).unwrap();
//! let line = price.multiply_slow(3).unwrap();
//! let shipping = Money::new(CurrencyCode::usd(), 5, 0).unwrap();
//!
//! assert_eq!(line.sum(&shipping).unwrap(), Money::new(CurrencyCode::usd(), 35, 0).unwrap());
//! ```

use core::cmp::Ordering;
use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::currency::CurrencyCode;

/// Number of nanos in one whole unit.
pub const NANOS_PER_UNIT: i32 = 1_000_000_000;

const NANOS_MIN: i32 = -999_999_999;
const NANOS_MAX: i32 = 999_999_999;

/// Scale of the nanos field when expressed as a decimal.
const NANOS_SCALE: u32 = 9;

/// Errors produced by money arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The operands are denominated in different currencies.
    #[error("mismatching currency codes: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },

    /// The result does not fit in the `units` range.
    #[error("money value out of range")]
    Overflow,

    /// An operand violates the nanos range or sign invariant.
    #[error("invalid money value: {0}")]
    InvalidValue(String),
}

/// An amount of money in a single currency.
///
/// Serialized as `{ "currencyCode", "units", "nanos" }`, the shape used by
/// every backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
    /// Whole units of the amount.
    #[serde(default)]
    pub units: i64,
    /// Nano (10⁻⁹) units of the amount.
    #[serde(default)]
    pub nanos: i32,
}

impl Money {
    /// Create a validated money value.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidValue` if `nanos` is out of range or its
    /// sign disagrees with `units`.
    pub fn new(currency_code: CurrencyCode, units: i64, nanos: i32) -> Result<Self, MoneyError> {
        let money = Self {
            currency_code,
            units,
            nanos,
        };
        if money.is_valid() {
            Ok(money)
        } else {
            Err(MoneyError::InvalidValue(money.describe()))
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            currency_code,
            units: 0,
            nanos: 0,
        }
    }

    /// Returns `true` if the nanos range and sign invariants hold.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let nanos_in_range = NANOS_MIN <= self.nanos && self.nanos <= NANOS_MAX;
        let signs_match = self.nanos == 0
            || self.units == 0
            || (self.nanos < 0) == (self.units < 0);
        nanos_in_range && signs_match
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.units == 0 && self.nanos == 0
    }

    /// Returns `true` if the amount is strictly negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.units < 0 || (self.units == 0 && self.nanos < 0)
    }

    /// The whole amount expressed in nanos.
    #[must_use]
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.units) * i128::from(NANOS_PER_UNIT) + i128::from(self.nanos)
    }

    /// Build a normalized value from a total number of nanos.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the units do not fit in an `i64`.
    pub fn from_total_nanos(currency_code: CurrencyCode, total: i128) -> Result<Self, MoneyError> {
        let per_unit = i128::from(NANOS_PER_UNIT);
        // Truncating division keeps the signs of units and nanos aligned.
        let units = i64::try_from(total / per_unit).map_err(|_| MoneyError::Overflow)?;
        let nanos = i32::try_from(total % per_unit).map_err(|_| MoneyError::Overflow)?;
        Ok(Self {
            currency_code,
            units,
            nanos,
        })
    }

    /// Add two amounts of the same currency.
    ///
    /// Nanos carry into units in either direction.
    ///
    /// # Errors
    ///
    /// - `MoneyError::CurrencyMismatch` if the currency codes differ
    /// - `MoneyError::InvalidValue` if either operand is invalid
    /// - `MoneyError::Overflow` if the result is out of range
    pub fn sum(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        self.ensure_valid()?;
        other.ensure_valid()?;

        let total = self
            .total_nanos()
            .checked_add(other.total_nanos())
            .ok_or(MoneyError::Overflow)?;
        Self::from_total_nanos(self.currency_code.clone(), total)
    }

    /// Multiply an amount by a non-negative integer.
    ///
    /// The result equals `n`-fold repeated [`sum`](Self::sum) of the value
    /// with itself; `n == 0` yields zero in the same currency.
    ///
    /// # Errors
    ///
    /// - `MoneyError::InvalidValue` if the value is invalid
    /// - `MoneyError::Overflow` if the result is out of range
    pub fn multiply_slow(&self, n: u32) -> Result<Self, MoneyError> {
        self.ensure_valid()?;
        let total = self
            .total_nanos()
            .checked_mul(i128::from(n))
            .ok_or(MoneyError::Overflow)?;
        Self::from_total_nanos(self.currency_code.clone(), total)
    }

    /// Compare two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` if the currency codes differ.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.total_nanos().cmp(&other.total_nanos()))
    }

    /// The amount as a decimal number of whole units.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.total_nanos(), NANOS_SCALE).normalize()
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency_code == other.currency_code {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency_code.clone(),
                right: other.currency_code.clone(),
            })
        }
    }

    fn ensure_valid(&self) -> Result<(), MoneyError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(MoneyError::InvalidValue(self.describe()))
        }
    }

    fn describe(&self) -> String {
        format!(
            "{} units={} nanos={}",
            self.currency_code, self.units, self.nanos
        )
    }
}

/// Amounts in different currencies are unordered.
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount(), self.currency_code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn usd(units: i64, nanos: i32) -> Money {
        Money::new(CurrencyCode::usd(), units, nanos).unwrap()
    }

    fn eur(units: i64, nanos: i32) -> Money {
        Money::new(CurrencyCode::from("EUR"), units, nanos).unwrap()
    }

    #[test]
    fn test_new_rejects_nanos_out_of_range() {
        let err = Money::new(CurrencyCode::usd(), 1, 1_000_000_000).unwrap_err();
        assert!(matches!(err, MoneyError::InvalidValue(_)));
    }

    #[test]
    fn test_new_rejects_mismatched_signs() {
        assert!(Money::new(CurrencyCode::usd(), 1, -1).is_err());
        assert!(Money::new(CurrencyCode::usd(), -1, 1).is_err());
        assert!(Money::new(CurrencyCode::usd(), 0, -1).is_ok());
        assert!(Money::new(CurrencyCode::usd(), -3, 0).is_ok());
    }

    #[test]
    fn test_sum_carries_nanos_into_units() {
        let total = usd(1, 600_000_000).sum(&usd(2, 500_000_000)).unwrap();
        assert_eq!(total, usd(4, 100_000_000));
    }

    #[test]
    fn test_sum_of_fractions_below_one_unit() {
        let total = usd(0, 500_000_000).sum(&usd(0, 300_000_000)).unwrap();
        assert_eq!(total, usd(0, 800_000_000));
    }

    #[test]
    fn test_sum_with_opposite_signs_borrows() {
        let total = usd(5, 0).sum(&usd(-1, -250_000_000)).unwrap();
        assert_eq!(total, usd(3, 750_000_000));

        let total = usd(-5, 0).sum(&usd(1, 250_000_000)).unwrap();
        assert_eq!(total, usd(-3, -750_000_000));
        assert!(total.is_valid());
    }

    #[test]
    fn test_sum_currency_mismatch() {
        let err = usd(1, 0).sum(&eur(1, 0)).unwrap_err();
        assert_eq!(
            err,
            MoneyError::CurrencyMismatch {
                left: CurrencyCode::usd(),
                right: CurrencyCode::from("EUR"),
            }
        );
    }

    #[test]
    fn test_sum_rejects_invalid_operand() {
        let bad = Money {
            currency_code: CurrencyCode::usd(),
            units: 1,
            nanos: -5,
        };
        assert!(matches!(
            usd(1, 0).sum(&bad),
            Err(MoneyError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_sum_overflow() {
        let max = usd(i64::MAX, 999_999_999);
        assert_eq!(max.sum(&usd(0, 1)).unwrap_err(), MoneyError::Overflow);
    }

    #[test]
    fn test_sub_unit_negatives() {
        let total = usd(0, -500_000_000).sum(&usd(0, -700_000_000)).unwrap();
        assert_eq!(total, usd(-1, -200_000_000));

        let total = usd(0, -500_000_000).sum(&usd(1, 0)).unwrap();
        assert_eq!(total, usd(0, 500_000_000));

        let product = usd(0, -400_000_000).multiply_slow(3).unwrap();
        assert_eq!(product, usd(-1, -200_000_000));
        assert!(product.is_valid());
    }

    #[test]
    fn test_multiply_slow_exact() {
        let price = usd(10, 0);
        assert_eq!(price.multiply_slow(3).unwrap(), usd(30, 0));

        let price = usd(0, 990_000_000);
        assert_eq!(price.multiply_slow(3).unwrap(), usd(2, 970_000_000));
    }

    #[test]
    fn test_multiply_slow_by_zero_is_zero() {
        assert_eq!(usd(7, 250_000_000).multiply_slow(0).unwrap(), usd(0, 0));
    }

    #[test]
    fn test_multiply_slow_overflow() {
        let big = usd(i64::MAX / 2 + 1, 0);
        assert_eq!(big.multiply_slow(2).unwrap_err(), MoneyError::Overflow);
    }

    #[test]
    fn test_ordering_within_currency() {
        assert!(usd(1, 0) < usd(1, 1));
        assert!(usd(-1, 0) < usd(0, -1));
        assert_eq!(usd(2, 0).try_cmp(&usd(2, 0)).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_ordering_across_currencies_is_rejected() {
        assert_eq!(usd(1, 0).partial_cmp(&eur(1, 0)), None);
        assert!(matches!(
            usd(1, 0).try_cmp(&eur(1, 0)),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(usd(35, 0).to_string(), "35 USD");
        assert_eq!(eur(9, 200_000_000).to_string(), "9.2 EUR");
        assert_eq!(usd(0, -500_000_000).to_string(), "-0.5 USD");
    }

    #[test]
    fn test_serde_wire_shape() {
        let json = serde_json::to_value(usd(12, 340_000_000)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"currencyCode": "USD", "units": 12, "nanos": 340_000_000})
        );

        let parsed: Money = serde_json::from_str(r#"{"currencyCode":"EUR","units":3}"#).unwrap();
        assert_eq!(parsed, eur(3, 0));
    }

    // Sign is drawn on its own so sub-unit negatives (units 0, nanos < 0) occur.
    fn arb_money() -> impl Strategy<Value = Money> {
        (
            any::<bool>(),
            prop_oneof![Just(0_i64), 0_i64..1_000_000_000],
            0..NANOS_PER_UNIT,
        )
            .prop_map(|(negative, units, nanos)| {
                let sign = if negative { -1 } else { 1 };
                Money {
                    currency_code: CurrencyCode::usd(),
                    units: units * i64::from(sign),
                    nanos: nanos * sign,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_multiply_equals_repeated_sum(m in arb_money(), n in 0_u32..40) {
            let mut repeated = Money::zero(CurrencyCode::usd());
            for _ in 0..n {
                repeated = repeated.sum(&m).unwrap();
            }
            prop_assert_eq!(m.multiply_slow(n).unwrap(), repeated);
        }

        #[test]
        fn prop_results_stay_valid(a in arb_money(), b in arb_money()) {
            prop_assert!(a.sum(&b).unwrap().is_valid());
        }

        #[test]
        fn prop_sum_rejects_any_currency_mismatch(
            a in arb_money(),
            b in arb_money(),
            code in "[A-Z]{3}",
        ) {
            prop_assume!(code != "USD");
            let other = Money { currency_code: CurrencyCode::from(code.as_str()), ..b };
            let is_mismatch = matches!(
                a.sum(&other),
                Err(MoneyError::CurrencyMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }
    }
}
