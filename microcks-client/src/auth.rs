//! Stored token inspection
//!
//! Tokens are parsed without signature verification: the trust boundary is
//! the authenticated login that produced them, not this read. Only the
//! expiry claim decides whether a refresh is needed.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use microcks_shared::{MicrocksError, Result};

/// Claims the CLI cares about from a stored access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiration time, seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl TokenClaims {
    /// True when the token carries an expiry claim that has passed.
    /// A token without an expiry never counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.exp {
            Some(exp) => exp <= Utc::now().timestamp(),
            None => false,
        }
    }

    /// Display name of the logged-in user, when the token carries one.
    pub fn username(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or_default()
    }
}

/// Decodes a token's claims without verifying its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| MicrocksError::Validation(format!("cannot parse auth token: {e}")))?;
    Ok(data.claims)
}
