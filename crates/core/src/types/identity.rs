//! Visitor identity and the rules that derive it.
//!
//! The effective owner of a cart or order is never stored. It is recomputed
//! on every request from two pieces of client state: the anonymous session id
//! (always present once the session middleware ran) and an optional auth
//! token. The token is only trusted after a profile lookup, whose outcome is
//! modelled by [`TokenCheck`]:
//!
//! | token        | profile lookup | identity                | token expired |
//! |--------------|----------------|-------------------------|---------------|
//! | absent       | n/a            | `Anonymous(session)`    | no            |
//! | present      | ok             | `Authenticated(user)`   | no            |
//! | present      | fails          | `Anonymous(session)`    | yes           |

use core::fmt;

use serde::Serialize;

use super::id::{SessionId, Username};

/// The resolved owner key of a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Identity {
    /// Not logged in; carts live under the session id.
    Anonymous(SessionId),
    /// Logged in; carts and orders live under the username.
    Authenticated(Username),
}

impl Identity {
    /// The key used to address carts and orders.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Anonymous(session) => session.as_str(),
            Self::Authenticated(user) => user.as_str(),
        }
    }

    /// Returns `true` for a logged-in visitor.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The username of a logged-in visitor.
    #[must_use]
    pub const fn username(&self) -> Option<&Username> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Outcome of validating the visitor's auth token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    /// No token cookie was sent.
    Absent,
    /// The auth backend accepted the token and returned this username.
    Valid(Username),
    /// A token was sent but the profile lookup failed.
    Rejected,
}

/// Result of identity resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Identity to use for the rest of the request.
    pub identity: Identity,
    /// The token was rejected; the caller should clear auth client state.
    pub token_expired: bool,
}

impl Resolution {
    /// Apply the identity rules to a session id and a token check.
    #[must_use]
    pub fn resolve(session: SessionId, check: TokenCheck) -> Self {
        match check {
            TokenCheck::Absent => Self {
                identity: Identity::Anonymous(session),
                token_expired: false,
            },
            TokenCheck::Valid(user) => Self {
                identity: Identity::Authenticated(user),
                token_expired: false,
            },
            TokenCheck::Rejected => Self {
                identity: Identity::Anonymous(session),
                token_expired: true,
            },
        }
    }
}
