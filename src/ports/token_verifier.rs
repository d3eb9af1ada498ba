//! Token verifier port.

use crate::domain::foundation::UserId;
use crate::domain::subscription::BillingError;

/// Claims extracted from a verified bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthClaims {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Port for verifying bearer tokens on authenticated routes.
///
/// Verification is pure CPU work, so the port is synchronous.
pub trait TokenVerifier: Send + Sync {
    /// Verifies a bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Unauthenticated` for any token that fails
    /// verification; callers map that to 401.
    fn verify(&self, token: &str) -> Result<AuthClaims, BillingError>;
}
