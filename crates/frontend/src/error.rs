//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::consolidation::ConsolidationError;
use crate::validation::ValidationError;

/// Application-level error type for the frontend.
#[derive(Debug, Error)]
pub enum AppError {
    /// A consolidation could not produce its result.
    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),

    /// A submitted form failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a failed operation involving a product lookup, turning a catalog
    /// 404 into `NotFound`.
    #[must_use]
    pub fn product_lookup(err: ConsolidationError, id: &str) -> Self {
        match err {
            ConsolidationError::UpstreamUnavailable {
                what: "product",
                ref source,
            } if source.status() == Some(404) => Self::NotFound(format!("product {id}")),
            err => Self::Consolidation(err),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Consolidation(ConsolidationError::UpstreamUnavailable { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Consolidation(ConsolidationError::Money(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Consolidation(ConsolidationError::UpstreamUnavailable { what, .. }) => {
                format!("{what} is unavailable, please try again later")
            }
            Self::Consolidation(ConsolidationError::Money(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            Json(json!({ "error": message, "status_code": status.as_u16() })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a username.
///
/// Call this once the request's identity is resolved so errors carry the user.
pub fn set_sentry_user(username: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "OLJCESPC7Z")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::UpstreamError;
    use boutique_core::MoneyError;

    fn upstream(status: u16) -> ConsolidationError {
        ConsolidationError::upstream("product")(UpstreamError::Status {
            backend: "catalog",
            status,
            body: String::new(),
        })
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(get_status(upstream(503).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            get_status(ConsolidationError::Money(MoneyError::Overflow).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(ValidationError::new("quantity", "must be between 1 and 10").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_product_lookup_maps_404() {
        assert!(matches!(
            AppError::product_lookup(upstream(404), "X"),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::product_lookup(upstream(500), "X"),
            AppError::Consolidation(_)
        ));

        let cart_404 = ConsolidationError::upstream("cart")(UpstreamError::Status {
            backend: "cart",
            status: 404,
            body: String::new(),
        });
        assert!(matches!(
            AppError::product_lookup(cart_404, "X"),
            AppError::Consolidation(_)
        ));
    }
}
