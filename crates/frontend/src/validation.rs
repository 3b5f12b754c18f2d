//! Validation of submitted forms.
//!
//! Forms arrive with every field as text so that a malformed number is
//! reported like any other invalid field. Each `validate` collects every
//! problem before failing.

use boutique_core::{Address, CreditCardInfo, CurrencyCode, ProductId};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consolidation::OrderDetails;

/// Largest quantity accepted in one add-to-cart.
pub const MAX_ADD_QUANTITY: u32 = 10;

const MAX_EMAIL_LEN: usize = 320;
const MAX_STREET_LEN: usize = 512;
const MAX_FIELD_LEN: usize = 128;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// A form with one or more invalid fields.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", describe(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            fields: vec![FieldError {
                field,
                message: message.into(),
            }],
        }
    }
}

/// Accumulates field errors.
#[derive(Default)]
struct Checker {
    fields: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn text(&mut self, field: &'static str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, "is required");
        } else if value.chars().count() > max {
            self.fail(field, format!("must be at most {max} characters"));
        }
        value.to_string()
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str, value: &str) -> Option<T> {
        let parsed = value.trim().parse().ok();
        if parsed.is_none() {
            self.fail(field, "must be a number");
        }
        parsed
    }

    fn in_range<T: PartialOrd>(
        &mut self,
        field: &'static str,
        value: Option<T>,
        range: std::ops::RangeInclusive<T>,
        message: impl Into<String>,
    ) -> Option<T> {
        let value = value?;
        if range.contains(&value) {
            Some(value)
        } else {
            self.fail(field, message);
            None
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.fields.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                fields: self.fields,
            })
        }
    }
}

/// `POST /cart`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: String,
}

impl AddToCartForm {
    /// # Errors
    ///
    /// Returns `ValidationError` unless the product id is set and the
    /// quantity is between 1 and [`MAX_ADD_QUANTITY`].
    pub fn validate(&self) -> Result<(ProductId, u32), ValidationError> {
        let mut check = Checker::default();
        let product_id = check.text("product_id", &self.product_id, MAX_FIELD_LEN);
        let quantity = check.number("quantity", &self.quantity);
        let quantity = check.in_range(
            "quantity",
            quantity,
            1..=MAX_ADD_QUANTITY,
            format!("must be between 1 and {MAX_ADD_QUANTITY}"),
        );
        check.finish((ProductId::new(product_id), quantity.unwrap_or_default()))
    }
}

/// `POST /cart/update`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: String,
}

impl UpdateCartForm {
    /// # Errors
    ///
    /// Returns `ValidationError` unless the product id is set and the
    /// quantity is a non-negative number.
    pub fn validate(&self) -> Result<(ProductId, u32), ValidationError> {
        let mut check = Checker::default();
        let product_id = check.text("product_id", &self.product_id, MAX_FIELD_LEN);
        let quantity = check.number("quantity", &self.quantity);
        check.finish((ProductId::new(product_id), quantity.unwrap_or_default()))
    }
}

/// `POST /setCurrency`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetCurrencyForm {
    pub currency_code: String,
}

impl SetCurrencyForm {
    /// # Errors
    ///
    /// Returns `ValidationError` unless the code is three uppercase letters.
    pub fn validate(&self) -> Result<CurrencyCode, ValidationError> {
        CurrencyCode::parse(self.currency_code.trim())
            .map_err(|e| ValidationError::new("currency_code", e.to_string()))
    }
}

/// `POST /cart/checkout`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlaceOrderForm {
    pub email: String,
    pub street_address: String,
    pub zip_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub credit_card_number: String,
    pub credit_card_expiration_month: String,
    pub credit_card_expiration_year: String,
    pub credit_card_cvv: String,
}

impl PlaceOrderForm {
    /// Validate against the current year.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing every invalid field.
    pub fn validate(&self) -> Result<OrderDetails, ValidationError> {
        self.validate_at(chrono::Utc::now().year())
    }

    /// Validate with `current_year` as the earliest accepted expiration year.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing every invalid field.
    pub fn validate_at(&self, current_year: i32) -> Result<OrderDetails, ValidationError> {
        let mut check = Checker::default();

        let email = check.text("email", &self.email, MAX_EMAIL_LEN);
        if !email.is_empty() && !is_email(&email) {
            check.fail("email", "must be a valid email address");
        }

        let street_address = check.text("street_address", &self.street_address, MAX_STREET_LEN);
        let city = check.text("city", &self.city, MAX_FIELD_LEN);
        let state = check.text("state", &self.state, MAX_FIELD_LEN);
        let country = check.text("country", &self.country, MAX_FIELD_LEN);
        let zip_code: i32 = check.number("zip_code", &self.zip_code).unwrap_or_default();

        let card: String = self
            .credit_card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(12..=19).contains(&card.len()) || !card.chars().all(|c| c.is_ascii_digit()) {
            check.fail("credit_card_number", "must be 12 to 19 digits");
        }

        let month = check.number("credit_card_expiration_month", &self.credit_card_expiration_month);
        let month = check.in_range(
            "credit_card_expiration_month",
            month,
            1..=12,
            "must be between 1 and 12",
        );

        let year = check.number("credit_card_expiration_year", &self.credit_card_expiration_year);
        let year = check.in_range(
            "credit_card_expiration_year",
            year,
            current_year..=i32::MAX,
            "card has expired",
        );

        let cvv = self.credit_card_cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            check.fail("credit_card_cvv", "must be 3 or 4 digits");
        }
        let credit_card_cvv: i32 = cvv.parse().unwrap_or_default();

        check.finish(OrderDetails {
            email,
            address: Address {
                street_address,
                city,
                state,
                country,
                zip_code,
            },
            credit_card: CreditCardInfo {
                credit_card_number: card,
                credit_card_cvv,
                credit_card_expiration_year: year.unwrap_or_default(),
                credit_card_expiration_month: month.unwrap_or_default(),
            },
        })
    }
}

/// `local@domain.tld` with no whitespace.
fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_form() -> PlaceOrderForm {
        PlaceOrderForm {
            email: "someone@example.com".to_string(),
            street_address: "1600 Amphitheatre Parkway".to_string(),
            zip_code: "94043".to_string(),
            city: "Mountain View".to_string(),
            state: "CA".to_string(),
            country: "United States".to_string(),
            credit_card_number: "4432-8015-6152-0454".to_string(),
            credit_card_expiration_month: "1".to_string(),
            credit_card_expiration_year: "2030".to_string(),
            credit_card_cvv: "672".to_string(),
        }
    }

    fn failed_fields(err: &ValidationError) -> Vec<&'static str> {
        err.fields.iter().map(|f| f.field).collect()
    }

    #[test]
    fn test_add_to_cart_quantity_bounds() {
        let form = |q: &str| AddToCartForm {
            product_id: "OLJCESPC7Z".to_string(),
            quantity: q.to_string(),
        };
        assert_eq!(form("1").validate().unwrap(), (ProductId::new("OLJCESPC7Z"), 1));
        assert_eq!(form("10").validate().unwrap().1, 10);
        assert!(form("0").validate().is_err());
        assert!(form("11").validate().is_err());

        let err = form("two").validate().unwrap_err();
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields.first().unwrap().message, "must be a number");
    }

    #[test]
    fn test_add_to_cart_requires_product() {
        let err = AddToCartForm {
            product_id: "  ".to_string(),
            quantity: "1".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(failed_fields(&err), vec!["product_id"]);
    }

    #[test]
    fn test_update_cart_allows_zero() {
        let form = UpdateCartForm {
            product_id: "A".to_string(),
            quantity: "0".to_string(),
        };
        assert_eq!(form.validate().unwrap().1, 0);
        let form = UpdateCartForm {
            product_id: "A".to_string(),
            quantity: "-1".to_string(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_set_currency() {
        let ok = SetCurrencyForm {
            currency_code: "EUR".to_string(),
        };
        assert_eq!(ok.validate().unwrap().as_str(), "EUR");
        for bad in ["", "eur", "EURO", "E1R"] {
            let form = SetCurrencyForm {
                currency_code: bad.to_string(),
            };
            assert!(form.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_place_order_valid() {
        let details = order_form().validate_at(2026).unwrap();
        assert_eq!(details.credit_card.credit_card_number, "4432801561520454");
        assert_eq!(details.credit_card.credit_card_cvv, 672);
        assert_eq!(details.address.zip_code, 94043);
        assert_eq!(details.email, "someone@example.com");
    }

    #[test]
    fn test_place_order_collects_every_problem() {
        let form = PlaceOrderForm {
            email: "not-an-email".to_string(),
            city: String::new(),
            credit_card_number: "1234".to_string(),
            credit_card_expiration_month: "13".to_string(),
            credit_card_expiration_year: "2020".to_string(),
            credit_card_cvv: "12345".to_string(),
            ..order_form()
        };
        let err = form.validate_at(2026).unwrap_err();
        assert_eq!(
            failed_fields(&err),
            vec![
                "email",
                "city",
                "credit_card_number",
                "credit_card_expiration_month",
                "credit_card_expiration_year",
                "credit_card_cvv",
            ]
        );
        assert!(err.to_string().starts_with("email: must be a valid email address; city: is required"));
    }

    #[test]
    fn test_place_order_field_lengths() {
        let form = PlaceOrderForm {
            state: "x".repeat(MAX_FIELD_LEN + 1),
            ..order_form()
        };
        let err = form.validate_at(2026).unwrap_err();
        assert_eq!(failed_fields(&err), vec!["state"]);
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a b@c.de"));
        assert!(!is_email("a@.com"));
    }
}
