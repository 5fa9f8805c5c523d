//! JWT Token Issuer
//!
//! Signs access/refresh token pairs over a set of identity claims and
//! verifies tokens, keeping expiry apart from every other failure so the
//! gate can decide whether a renewal is allowed.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;

use crate::auth::models::{Claims, IdentityClaims};
use crate::config::ConfigError;

/// Access token validity window.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
/// Refresh token validity window.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Errors produced while signing or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature is valid but `exp` is in the past.
    #[error("token has expired")]
    Expired,
    /// Bad signature, malformed token, wrong algorithm, missing claims...
    #[error("token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies tokens with one process-wide HMAC secret.
///
/// Built once at startup and shared behind an `Arc`; it holds no mutable
/// state, so concurrent requests never contend on it.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer from the signing secret.
    ///
    /// An empty secret is a configuration error and must stop startup.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingVar("JWT_SECRET"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue a new pair whose lifetimes start now.
    pub fn issue(&self, claims: &IdentityClaims) -> Result<TokenPair, TokenError> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a new pair whose lifetimes start at `issued_at`.
    pub fn issue_at(
        &self,
        claims: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let access_exp = issued_at + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);
        let refresh_exp = issued_at + Duration::days(REFRESH_TOKEN_TTL_DAYS);

        Ok(TokenPair {
            access_token: self.sign(claims, issued_at, access_exp)?,
            refresh_token: self.sign(claims, issued_at, refresh_exp)?,
        })
    }

    /// Verify signature and expiry, returning the embedded identity.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        self.verify_claims(token).map(|claims| claims.identity)
    }

    /// Like [`verify`](Self::verify) but keeps `iat` and `exp`.
    pub fn verify_claims(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }

    fn sign(
        &self,
        identity: &IdentityClaims,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            identity: identity.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;

    fn claims() -> IdentityClaims {
        IdentityClaims {
            user_id: 42,
            email: "seller@example.com".to_string(),
            role: Role::Seller,
        }
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let issuer = TokenIssuer::new("test_secret").unwrap();
        let pair = issuer.issue(&claims()).unwrap();

        assert_eq!(issuer.verify(&pair.access_token).unwrap(), claims());
        assert_eq!(issuer.verify(&pair.refresh_token).unwrap(), claims());
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_access_token_expires_after_fifteen_minutes() {
        let issuer = TokenIssuer::new("test_secret").unwrap();

        let fresh = issuer
            .issue_at(&claims(), Utc::now() - Duration::minutes(14))
            .unwrap();
        assert_eq!(issuer.verify(&fresh.access_token).unwrap(), claims());

        let stale = issuer
            .issue_at(&claims(), Utc::now() - Duration::minutes(16))
            .unwrap();
        assert!(matches!(
            issuer.verify(&stale.access_token),
            Err(TokenError::Expired)
        ));
        // The paired refresh token is still inside its window.
        assert_eq!(issuer.verify(&stale.refresh_token).unwrap(), claims());
    }

    #[test]
    fn test_refresh_token_expires_after_seven_days() {
        let issuer = TokenIssuer::new("test_secret").unwrap();

        let fresh = issuer
            .issue_at(&claims(), Utc::now() - Duration::days(6))
            .unwrap();
        assert_eq!(issuer.verify(&fresh.refresh_token).unwrap(), claims());

        let stale = issuer
            .issue_at(&claims(), Utc::now() - Duration::days(7) - Duration::minutes(1))
            .unwrap();
        assert!(matches!(
            issuer.verify(&stale.refresh_token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_foreign_secret_is_invalid_even_when_expired() {
        let ours = TokenIssuer::new("test_secret").unwrap();
        let theirs = TokenIssuer::new("other_secret").unwrap();

        let live = theirs.issue(&claims()).unwrap();
        assert!(matches!(
            ours.verify(&live.access_token),
            Err(TokenError::Invalid(_))
        ));

        let expired = theirs
            .issue_at(&claims(), Utc::now() - Duration::days(30))
            .unwrap();
        assert!(matches!(
            ours.verify(&expired.access_token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_issue_is_deterministic_for_same_instant() {
        let issuer = TokenIssuer::new("test_secret").unwrap();
        let at = Utc::now();

        let a = issuer.issue_at(&claims(), at).unwrap();
        let b = issuer.issue_at(&claims(), at).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let issuer = TokenIssuer::new("test_secret").unwrap();
        assert!(matches!(
            issuer.verify("not-a-jwt"),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(issuer.verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        assert!(matches!(
            TokenIssuer::new(""),
            Err(ConfigError::MissingVar("JWT_SECRET"))
        ));
    }
}
