//! Token Gate
//!
//! Per-request authentication state machine. It only sees the two raw header
//! values and the issuer, so it can be driven without any HTTP types; the
//! axum adapter lives in [`crate::auth::middleware`].
//!
//! Only an *expired* access token may be renewed. Any other verification
//! failure is terminal, so a forged or corrupt access token can never be
//! used to test whether a refresh token is still good.

use crate::auth::jwt::{TokenError, TokenIssuer, TokenPair};
use crate::auth::models::Claims;

/// Scheme keyword expected in front of the access token.
pub const AUTH_SCHEME: &str = "JWT";

/// Coarse classification of a gate rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedOrMissingCredential,
    InvalidCredential,
}

/// Why a request was rejected. The display text is the exact message sent
/// to the client, which deliberately does not say which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Missing `Authorization` header or a scheme other than `JWT`.
    #[error("invalid token")]
    InvalidScheme,
    /// Scheme present but no token after it.
    #[error("token absent")]
    TokenAbsent,
    /// Signature failure, or an expired access token with no usable refresh token.
    #[error("invalid token")]
    InvalidCredential,
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::InvalidScheme | GateError::TokenAbsent => {
                ErrorKind::MalformedOrMissingCredential
            }
            GateError::InvalidCredential => ErrorKind::InvalidCredential,
        }
    }
}

/// Raw credential headers of an incoming request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHeaders<'a> {
    /// Value of `Authorization`
    pub authorization: Option<&'a str>,
    /// Value of `x-refresh-token`
    pub refresh_token: Option<&'a str>,
}

/// Successful outcome: who the caller is, and the rotated pair if one was issued.
///
/// After a rotation `claims` are the refresh token's, including its `iat`/`exp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub claims: Claims,
    pub renewed: Option<TokenPair>,
}

/// Run the gate for one request.
pub fn authenticate(
    issuer: &TokenIssuer,
    headers: CredentialHeaders<'_>,
) -> Result<Authorized, GateError> {
    let (prefix, token) = split_authorization(headers.authorization);

    if prefix != Some(AUTH_SCHEME) {
        return Err(GateError::InvalidScheme);
    }
    let token = token.ok_or(GateError::TokenAbsent)?;

    match issuer.verify_claims(token) {
        Ok(claims) => Ok(Authorized {
            claims,
            renewed: None,
        }),
        Err(TokenError::Expired) => renew(issuer, headers.refresh_token),
        Err(e) => {
            tracing::debug!("access token rejected: {}", e);
            Err(GateError::InvalidCredential)
        }
    }
}

/// Mint a new pair from the refresh token's embedded claims.
///
/// The claims are trusted as signed; the account is not looked up again.
fn renew(issuer: &TokenIssuer, refresh_token: Option<&str>) -> Result<Authorized, GateError> {
    let refresh_token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(GateError::InvalidCredential)?;

    let claims = issuer.verify_claims(refresh_token).map_err(|e| {
        tracing::debug!("refresh token rejected: {}", e);
        GateError::InvalidCredential
    })?;

    let pair = issuer.issue(&claims.identity).map_err(|e| {
        tracing::error!("failed to issue rotated token pair: {}", e);
        GateError::InvalidCredential
    })?;

    tracing::info!(user_id = claims.identity.user_id, "rotated expired access token");

    Ok(Authorized {
        claims,
        renewed: Some(pair),
    })
}

/// Split `"<prefix> <token>"` on single spaces; extra segments are ignored.
fn split_authorization(header: Option<&str>) -> (Option<&str>, Option<&str>) {
    let Some(value) = header.filter(|v| !v.is_empty()) else {
        return (None, None);
    };

    let mut parts = value.split(' ');
    let prefix = parts.next();
    let token = parts.next().filter(|t| !t.is_empty());
    (prefix, token)
}
