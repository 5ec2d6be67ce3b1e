//! JWT inspection for bearer tokens issued by the backend.
//!
//! DESIGN
//! ======
//! The client never holds the signing key, so tokens are decoded without
//! signature validation. Only the claims the client acts on are read: the
//! subject (the user's email) and the expiry.

#[cfg(test)]
#[path = "jwt_test.rs"]
mod jwt_test;

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;

use crate::net::types::AuthToken;

/// Errors produced while decoding a token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token carries no JWT at all.
    #[error("no token present")]
    MissingToken,
    /// The JWT is malformed or its claims are not JSON.
    #[error("token decode failed: {0}")]
    Decode(String),
    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,
}

/// Claims read from backend-issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject id (the user's email).
    pub sub: Option<String>,
    /// Expiry as Unix seconds.
    pub exp: Option<u64>,
}

fn inspection_validation() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the claims of `token` without verifying its signature.
///
/// # Errors
///
/// Returns [`JwtError::MissingToken`] when there is no JWT and
/// [`JwtError::Decode`] when it cannot be parsed.
pub fn decode_claims(token: &AuthToken) -> Result<TokenClaims, JwtError> {
    let jwt = token.jwt.as_deref().ok_or(JwtError::MissingToken)?;
    jsonwebtoken::decode::<TokenClaims>(jwt, &DecodingKey::from_secret(&[]), &inspection_validation())
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

/// Subject id of `token`, or `None` when absent or undecodable.
#[must_use]
pub fn subject_id(token: &AuthToken) -> Option<String> {
    decode_claims(token).ok().and_then(|claims| claims.sub)
}

/// True when `token` is missing, undecodable, or past its `exp` claim.
///
/// Tokens without an `exp` claim never expire.
#[must_use]
pub fn is_token_expired(token: &AuthToken) -> bool {
    is_token_expired_at(token, now_secs())
}

pub(crate) fn is_token_expired_at(token: &AuthToken, now: u64) -> bool {
    match decode_claims(token) {
        Ok(TokenClaims { exp: Some(exp), .. }) => exp <= now,
        Ok(TokenClaims { exp: None, .. }) => false,
        Err(_) => true,
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub(crate) mod test_helpers {
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use crate::net::types::AuthToken;

    /// Sign a token for `sub` expiring at `exp` (Unix seconds).
    pub(crate) fn token_with_exp(sub: &str, exp: u64) -> AuthToken {
        let claims = json!({ "sub": sub, "exp": exp, "iat": 1_700_000_000_u64 });
        let jwt = jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
            .expect("encode test token");
        AuthToken::new(jwt)
    }

    /// Sign a token for `sub` that expires far in the future.
    pub(crate) fn valid_token(sub: &str) -> AuthToken {
        token_with_exp(sub, 4_102_444_800)
    }

    /// Sign a token for `sub` that expired long ago.
    pub(crate) fn expired_token(sub: &str) -> AuthToken {
        token_with_exp(sub, 1_000_000_000)
    }
}
