//! Identity resolution and cart migration.

use boutique_core::{CartItem, Degraded, Resolution, SessionId, TokenCheck, Username};
use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{ConsolidationError, Consolidator, RequestContext};
use crate::backends::{AuthRejection, LoginSession, Profile, Registration};

/// Identity of a visitor plus the profile that proved it.
#[derive(Debug, Clone)]
pub struct ResolvedVisitor {
    pub resolution: Resolution,
    pub profile: Option<Profile>,
}

/// What a cart migration moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Lines added to the user's cart.
    pub items_moved: usize,
    /// Lines that could not be added and stayed behind.
    pub items_failed: usize,
    /// The anonymous cart was emptied afterwards. Stays false while a failed
    /// line is left behind in it.
    pub anonymous_cart_emptied: bool,
}

impl Consolidator {
    /// Derive the visitor's identity from the session id and auth token.
    ///
    /// A token is trusted only after a successful profile lookup. Any failure
    /// (rejection or unreachable auth backend) reverts the visitor to
    /// anonymous and flags the token as expired.
    ///
    /// `username_hint` (the display-name cookie) is only used when the profile
    /// carries no username.
    #[instrument(skip_all, fields(session = %session, has_token = token.is_some()))]
    pub async fn resolve_identity(
        &self,
        session: SessionId,
        token: Option<&SecretString>,
        username_hint: Option<&str>,
    ) -> ResolvedVisitor {
        let Some(token) = token else {
            return ResolvedVisitor {
                resolution: Resolution::resolve(session, TokenCheck::Absent),
                profile: None,
            };
        };

        let (check, profile) = match self.backends.auth.profile(token).await {
            Ok(Ok(profile)) => {
                let username = if profile.username.is_empty() {
                    username_hint.unwrap_or_default().to_string()
                } else {
                    profile.username.clone()
                };
                if username.is_empty() {
                    warn!("Profile lookup returned no username; treating token as expired");
                    (TokenCheck::Rejected, None)
                } else {
                    (TokenCheck::Valid(Username::from(username)), Some(profile))
                }
            }
            Ok(Err(rejection)) => {
                warn!(reason = %rejection, "Auth token rejected");
                (TokenCheck::Rejected, None)
            }
            Err(e) => {
                warn!(error = %e, "Profile lookup failed; treating token as expired");
                (TokenCheck::Rejected, None)
            }
        };

        ResolvedVisitor {
            resolution: Resolution::resolve(session, check),
            profile,
        }
    }

    /// Log in, then move the anonymous cart into the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ConsolidationError::UpstreamUnavailable` if the auth backend
    /// cannot be reached. Bad credentials are an `Ok(Err(_))`.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, session = %ctx.session))]
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &SecretString,
    ) -> Result<Result<(LoginSession, Degraded<MigrationReport>), AuthRejection>, ConsolidationError>
    {
        let session = match self
            .backends
            .auth
            .login(email, password)
            .await
            .map_err(ConsolidationError::upstream("auth"))?
        {
            Ok(session) => session,
            Err(rejection) => {
                warn!(reason = %rejection, "Login rejected");
                return Ok(Err(rejection));
            }
        };
        info!(username = %session.username, "User logged in");

        let migration = self.migrate_cart(&ctx.session, &session.username).await;
        Ok(Ok((session, migration)))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `ConsolidationError::UpstreamUnavailable` if the auth backend
    /// cannot be reached.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Result<(), AuthRejection>, ConsolidationError> {
        let outcome = self
            .backends
            .auth
            .register(registration)
            .await
            .map_err(ConsolidationError::upstream("auth"))?;
        match &outcome {
            Ok(()) => info!("User registered"),
            Err(rejection) => warn!(reason = %rejection, "Registration rejected"),
        }
        Ok(outcome)
    }

    /// Merge the anonymous cart of `from` into the cart of `to`.
    ///
    /// Each line is added (quantities add up) independently; a failed line is
    /// logged and left behind in the anonymous cart. When every line moved the
    /// anonymous cart is emptied, otherwise only the moved lines are removed
    /// from it. Nothing is rolled back, so a retried login may move a line
    /// twice.
    #[instrument(skip_all, fields(from = %from, to = %to))]
    pub async fn migrate_cart(&self, from: &SessionId, to: &Username) -> Degraded<MigrationReport> {
        let mut result = Degraded::complete(MigrationReport::default());
        if from.is_empty() || from.as_str() == to.as_str() {
            return result;
        }

        let items = match self.backends.cart.get_cart(from.as_str()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Could not read anonymous cart for migration");
                result.push_issue(format!("anonymous cart unreadable: {e}"));
                return result;
            }
        };
        if items.is_empty() {
            return result;
        }

        let mut moved = Vec::with_capacity(items.len());
        for item in &items {
            match self.backends.cart.add_item(to.as_str(), item).await {
                Ok(()) => {
                    result.value.items_moved += 1;
                    moved.push(&item.product_id);
                }
                Err(e) => {
                    warn!(product_id = %item.product_id, error = %e, "Failed to migrate cart item");
                    result.value.items_failed += 1;
                    result.push_issue(format!("item {} not migrated: {e}", item.product_id));
                }
            }
        }

        if result.value.items_failed == 0 {
            match self.backends.cart.empty_cart(from.as_str()).await {
                Ok(()) => result.value.anonymous_cart_emptied = true,
                Err(e) => {
                    warn!(error = %e, "Failed to empty anonymous cart after migration");
                    result.push_issue(format!("anonymous cart not emptied: {e}"));
                }
            }
        } else {
            for product_id in moved {
                let removal = CartItem::new(product_id.clone(), 0);
                if let Err(e) = self.backends.cart.update_item(from.as_str(), &removal).await {
                    warn!(product_id = %product_id, error = %e, "Failed to remove migrated line");
                    result.push_issue(format!("item {product_id} left in anonymous cart: {e}"));
                }
            }
        }

        info!(
            items_moved = result.value.items_moved,
            items_failed = result.value.items_failed,
            "Migrated anonymous cart to user cart"
        );
        result
    }
}
