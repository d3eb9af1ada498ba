//! Static token verifier for tests.

use std::collections::HashMap;

use crate::domain::subscription::BillingError;
use crate::ports::{AuthClaims, TokenVerifier};

/// Maps fixed token strings to claims. No cryptography involved.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, AuthClaims>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: AuthClaims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<AuthClaims, BillingError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| BillingError::Unauthenticated("unknown token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn known_token_verifies() {
        let verifier = StaticTokenVerifier::new().with_token(
            "tok-1",
            AuthClaims {
                user_id: UserId::new("u-1").unwrap(),
                email: None,
            },
        );

        assert_eq!(verifier.verify("tok-1").unwrap().user_id.as_str(), "u-1");
    }

    #[test]
    fn unknown_token_is_rejected() {
        let verifier = StaticTokenVerifier::new();
        assert!(matches!(
            verifier.verify("tok-x"),
            Err(BillingError::Unauthenticated(_))
        ));
    }
}
