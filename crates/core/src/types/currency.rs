//! Currency codes and USD-based currency conversion.
//!
//! [`CurrencyConverter`] holds an immutable table of rates relative to USD.
//! Conversion goes through the base currency:
//! `value_in_usd = value / rate[source]`, `result = value_in_usd × rate[target]`.
//!
//! The converter is deliberately lenient: a code missing from the table uses a
//! rate of `1.0` instead of failing, so an unexpected code never breaks price
//! display. The converted value is truncated toward zero at nano precision,
//! which means repeated conversions do not round-trip exactly.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::{Money, MoneyError};

/// The base currency every rate is expressed against.
pub const BASE_CURRENCY: &str = "USD";

/// Rate applied to a currency missing from the table.
const FALLBACK_RATE: f64 = 1.0;

const NANOS_PER_UNIT_F64: f64 = 1_000_000_000.0;

/// Built-in rates relative to USD.
const DEFAULT_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("CAD", 1.37),
    ("JPY", 154.70),
    ("GBP", 0.79),
    ("TRY", 34.25),
];

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyCodeError {
    /// The code does not have exactly three characters.
    #[error("currency code must be {expected} characters (got {actual})")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length of the input.
        actual: usize,
    },
    /// The code contains something other than uppercase ASCII letters.
    #[error("currency code must contain only uppercase letters A-Z")]
    InvalidCharacter,
}

/// Errors that can occur when building a rate table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// A rate is zero, negative, infinite or NaN.
    #[error("rate for {code} must be a positive finite number (got {rate})")]
    InvalidRate {
        /// Currency the rate belongs to.
        code: CurrencyCode,
        /// The rejected rate.
        rate: f64,
    },
}

/// An ISO 4217 currency code such as `USD`.
///
/// Values received from backends are accepted as-is via [`From<&str>`]; codes
/// chosen by a visitor go through [`CurrencyCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Length of an ISO 4217 alphabetic code.
    pub const LENGTH: usize = 3;

    /// Parse a code chosen by a visitor.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly three uppercase ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyCodeError> {
        if s.len() != Self::LENGTH {
            return Err(CurrencyCodeError::WrongLength {
                expected: Self::LENGTH,
                actual: s.len(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CurrencyCodeError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// The US dollar, base of every rate.
    #[must_use]
    pub fn usd() -> Self {
        Self(BASE_CURRENCY.to_owned())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Converts money between currencies using a fixed rate table.
///
/// Conversion is deterministic: the same input and table always give the same
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConverter {
    rates: BTreeMap<CurrencyCode, f64>,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self {
            rates: DEFAULT_RATES
                .iter()
                .map(|&(code, rate)| (CurrencyCode::from(code), rate))
                .collect(),
        }
    }
}

impl CurrencyConverter {
    /// Build a converter from explicit USD-relative rates.
    ///
    /// # Errors
    ///
    /// Returns `RateError::InvalidRate` for a rate that is not positive and finite.
    pub fn new(rates: impl IntoIterator<Item = (CurrencyCode, f64)>) -> Result<Self, RateError> {
        Self {
            rates: BTreeMap::new(),
        }
        .with_rates(rates)
    }

    /// Add or replace rates on top of the current table.
    ///
    /// # Errors
    ///
    /// Returns `RateError::InvalidRate` for a rate that is not positive and finite.
    pub fn with_rates(
        mut self,
        rates: impl IntoIterator<Item = (CurrencyCode, f64)>,
    ) -> Result<Self, RateError> {
        for (code, rate) in rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(RateError::InvalidRate { code, rate });
            }
            self.rates.insert(code, rate);
        }
        Ok(self)
    }

    /// The rate of `code` relative to USD, `1.0` when unknown.
    #[must_use]
    pub fn rate(&self, code: &CurrencyCode) -> f64 {
        self.rates.get(code).copied().unwrap_or(FALLBACK_RATE)
    }

    /// Returns `true` if the table has a rate for `code`.
    #[must_use]
    pub fn is_supported(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Currency codes present in the table, in code order.
    pub fn supported_currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.rates.keys()
    }

    /// Convert `money` into `target`.
    ///
    /// Same-currency conversion returns the input unchanged. When both rates
    /// resolve to the same factor (for example an unknown target and a USD
    /// source) the value is relabeled without arithmetic.
    ///
    /// # Errors
    ///
    /// - `MoneyError::InvalidValue` if `money` violates the money invariants
    /// - `MoneyError::Overflow` if the converted value is out of range
    pub fn convert(&self, money: &Money, target: &CurrencyCode) -> Result<Money, MoneyError> {
        if money.currency_code == *target {
            return Ok(money.clone());
        }
        if !money.is_valid() {
            return Err(MoneyError::InvalidValue(format!(
                "cannot convert {} units={} nanos={}",
                money.currency_code, money.units, money.nanos
            )));
        }

        let source_rate = self.rate(&money.currency_code);
        let target_rate = self.rate(target);

        #[allow(clippy::float_cmp)] // both sides come from the same table or the same fallback
        if source_rate == target_rate {
            return Ok(Money {
                currency_code: target.clone(),
                ..money.clone()
            });
        }

        #[allow(clippy::cast_precision_loss)] // conversion is documented as lossy
        let total = money.units as f64 * NANOS_PER_UNIT_F64 + f64::from(money.nanos);
        let converted = (total / source_rate * target_rate).trunc();
        if !converted.is_finite() {
            return Err(MoneyError::Overflow);
        }

        // `as` saturates; anything beyond the units range is caught below.
        #[allow(clippy::cast_possible_truncation)]
        let total_nanos = converted as i128;
        Money::from_total_nanos(target.clone(), total_nanos)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn money(code: &str, units: i64, nanos: i32) -> Money {
        Money::new(CurrencyCode::from(code), units, nanos).unwrap()
    }

    #[test]
    fn test_parse_currency_code() {
        assert_eq!(CurrencyCode::parse("EUR").unwrap().as_str(), "EUR");
        assert_eq!(
            CurrencyCode::parse("EURO").unwrap_err(),
            CurrencyCodeError::WrongLength {
                expected: 3,
                actual: 4
            }
        );
        assert_eq!(
            CurrencyCode::parse("eur").unwrap_err(),
            CurrencyCodeError::InvalidCharacter
        );
        assert!(CurrencyCode::parse("").is_err());
    }

    #[test]
    fn test_identity_conversion_returns_input() {
        let converter = CurrencyConverter::default();
        let m = money("JPY", 1234, 500_000_000);
        assert_eq!(converter.convert(&m, &CurrencyCode::from("JPY")).unwrap(), m);
    }

    #[test]
    fn test_usd_to_eur() {
        let converter = CurrencyConverter::default();
        let converted = converter
            .convert(&money("USD", 10, 0), &CurrencyCode::from("EUR"))
            .unwrap();
        assert_eq!(converted, money("EUR", 9, 200_000_000));
    }

    #[test]
    fn test_usd_to_jpy() {
        let converter = CurrencyConverter::default();
        let converted = converter
            .convert(&money("USD", 2, 0), &CurrencyCode::from("JPY"))
            .unwrap();
        assert_eq!(converted.currency_code.as_str(), "JPY");
        assert_eq!(converted.units, 309);
        // 309.4 with float noise truncated below the nano
        assert!((399_999_000..=400_000_000).contains(&converted.nanos));
    }

    #[test]
    fn test_cross_conversion_goes_through_usd() {
        let converter = CurrencyConverter::default();
        let converted = converter
            .convert(&money("EUR", 92, 0), &CurrencyCode::from("GBP"))
            .unwrap();
        // 92 EUR = 100 USD = 79 GBP, give or take float noise below the nano
        assert_eq!(converted.currency_code.as_str(), "GBP");
        assert!((converted.total_nanos() - 79_000_000_000).abs() <= 1_000);
    }

    #[test]
    fn test_conversion_truncates_toward_zero() {
        let converter = CurrencyConverter::new([
            (CurrencyCode::usd(), 1.0),
            (CurrencyCode::from("XTS"), 3.0),
        ])
        .unwrap();
        let converted = converter
            .convert(&money("XTS", 1, 0), &CurrencyCode::usd())
            .unwrap();
        assert_eq!(converted, money("USD", 0, 333_333_333));

        let converted = converter
            .convert(&money("XTS", -1, 0), &CurrencyCode::usd())
            .unwrap();
        assert_eq!(converted, money("USD", 0, -333_333_333));
    }

    #[test]
    fn test_unknown_target_relabels_value() {
        let converter = CurrencyConverter::default();
        let m = money("USD", 19, 990_000_000);
        let converted = converter.convert(&m, &CurrencyCode::from("XXX")).unwrap();
        assert_eq!(converted, money("XXX", 19, 990_000_000));
    }

    #[test]
    fn test_unknown_source_uses_fallback_rate() {
        let converter = CurrencyConverter::default();
        let converted = converter
            .convert(&money("ZZZ", 100, 0), &CurrencyCode::from("EUR"))
            .unwrap();
        assert_eq!(converted, money("EUR", 92, 0));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let converter = CurrencyConverter::default();
        let bad = Money {
            currency_code: CurrencyCode::usd(),
            units: 1,
            nanos: -1,
        };
        assert!(matches!(
            converter.convert(&bad, &CurrencyCode::from("EUR")),
            Err(MoneyError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_conversion_overflow() {
        let converter = CurrencyConverter::default();
        let huge = money("USD", i64::MAX / 10, 0);
        assert_eq!(
            converter
                .convert(&huge, &CurrencyCode::from("JPY"))
                .unwrap_err(),
            MoneyError::Overflow
        );
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(CurrencyConverter::new([(CurrencyCode::from("EUR"), 0.0)]).is_err());
        assert!(CurrencyConverter::new([(CurrencyCode::from("EUR"), f64::NAN)]).is_err());
        assert!(
            CurrencyConverter::default()
                .with_rates([(CurrencyCode::from("CHF"), -1.0)])
                .is_err()
        );
    }

    #[test]
    fn test_overrides_extend_default_table() {
        let converter = CurrencyConverter::default()
            .with_rates([(CurrencyCode::from("CHF"), 0.88), (CurrencyCode::from("EUR"), 0.9)])
            .unwrap();
        assert!(converter.is_supported(&CurrencyCode::from("CHF")));
        assert!((converter.rate(&CurrencyCode::from("EUR")) - 0.9).abs() < f64::EPSILON);
        assert!((converter.rate(&CurrencyCode::from("???")) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_supported_currencies_sorted() {
        let converter = CurrencyConverter::default();
        let codes: Vec<&str> = converter
            .supported_currencies()
            .map(CurrencyCode::as_str)
            .collect();
        assert_eq!(codes, ["CAD", "EUR", "GBP", "JPY", "TRY", "USD"]);
    }

    proptest! {
        #[test]
        fn prop_identity_law(units in -1_000_000_i64..1_000_000, nanos in 0..999_999_999_i32, code in "[A-Z]{3}") {
            let nanos = if units < 0 { -nanos } else { nanos };
            let m = Money { currency_code: CurrencyCode::from(code.as_str()), units, nanos };
            let converter = CurrencyConverter::default();
            prop_assert_eq!(converter.convert(&m, &m.currency_code).unwrap(), m.clone());
        }

        #[test]
        fn prop_unknown_target_never_fails(units in 0_i64..1_000_000_000, nanos in 0..999_999_999_i32) {
            let m = Money { currency_code: CurrencyCode::usd(), units, nanos };
            let converter = CurrencyConverter::default();
            let converted = converter.convert(&m, &CurrencyCode::from("QQQ")).unwrap();
            prop_assert_eq!(converted.units, units);
            prop_assert_eq!(converted.nanos, nanos);
        }

        #[test]
        fn prop_conversion_is_deterministic(units in 0_i64..1_000_000, nanos in 0..999_999_999_i32) {
            let m = Money { currency_code: CurrencyCode::usd(), units, nanos };
            let converter = CurrencyConverter::default();
            let target = CurrencyCode::from("TRY");
            prop_assert_eq!(converter.convert(&m, &target).unwrap(), converter.convert(&m, &target).unwrap());
        }
    }
}
