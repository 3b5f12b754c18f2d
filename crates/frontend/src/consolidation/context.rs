//! Per-request context handed through every consolidation call.

use boutique_core::{CurrencyCode, Identity, SessionId};

use crate::backends::Profile;

/// Everything a consolidation needs to know about the current request.
///
/// Built once per request by the client-state middleware and passed
/// explicitly; nothing is looked up from ambient state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, also recorded on the request span.
    pub request_id: String,
    /// Anonymous session id; present even for logged-in visitors.
    pub session: SessionId,
    /// Resolved owner of carts and orders.
    pub identity: Identity,
    /// Display currency.
    pub currency: CurrencyCode,
    /// The auth token was rejected during resolution.
    pub token_expired: bool,
    /// Profile returned by the token check, when it succeeded.
    pub profile: Option<Profile>,
}

impl RequestContext {
    /// Context for a visitor without a token.
    #[must_use]
    pub fn anonymous(request_id: impl Into<String>, session: SessionId, currency: CurrencyCode) -> Self {
        Self {
            request_id: request_id.into(),
            identity: Identity::Anonymous(session.clone()),
            session,
            currency,
            token_expired: false,
            profile: None,
        }
    }
}
