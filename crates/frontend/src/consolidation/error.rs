//! Errors that abort a consolidation.

use boutique_core::MoneyError;
use thiserror::Error;

use crate::backends::UpstreamError;

/// A hard failure of a consolidation operation.
///
/// Best-effort steps never produce this; they report through
/// [`boutique_core::Degraded`] instead.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// Money arithmetic or conversion failed.
    #[error("money arithmetic failed: {0}")]
    Money(#[from] MoneyError),

    /// A backend the operation cannot do without failed.
    #[error("{what} unavailable: {source}")]
    UpstreamUnavailable {
        what: &'static str,
        #[source]
        source: UpstreamError,
    },
}

impl ConsolidationError {
    /// Map an upstream failure of the named dependency.
    pub fn upstream(what: &'static str) -> impl Fn(UpstreamError) -> Self {
        move |source| Self::UpstreamUnavailable { what, source }
    }

    /// Status code the upstream answered with, if any.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamUnavailable { source, .. } => source.status(),
            Self::Money(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_keeps_context() {
        let err = ConsolidationError::upstream("product")(UpstreamError::Status {
            backend: "catalog",
            status: 404,
            body: "no such product".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "product unavailable: catalog: status 404: no such product"
        );
        assert_eq!(err.upstream_status(), Some(404));
        assert_eq!(ConsolidationError::Money(MoneyError::Overflow).upstream_status(), None);
    }
}
