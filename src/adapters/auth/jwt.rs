//! JWT bearer token verification.
//!
//! Verifies HS256 tokens issued by the authentication collaborator against
//! a shared secret. Expiry and subject are mandatory; an optional issuer
//! check is applied when configured.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::UserId;
use crate::domain::subscription::BillingError;
use crate::ports::{AuthClaims, TokenVerifier};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
    #[serde(default)]
    email: Option<String>,
}

/// HS256 token verifier backed by a shared signing secret.
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &SecretString, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<AuthClaims, BillingError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("token expired");
                        BillingError::Unauthenticated("token expired".to_string())
                    }
                    _ => {
                        tracing::debug!(error = %e, "token verification failed");
                        BillingError::Unauthenticated("invalid token".to_string())
                    }
                }
            })?;

        let user_id = UserId::new(&token_data.claims.sub)
            .map_err(|_| BillingError::Unauthenticated("empty subject".to_string()))?;

        Ok(AuthClaims {
            user_id,
            email: token_data.claims.email,
        })
    }
}
