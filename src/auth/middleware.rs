//! Authentication Middleware
//!
//! Axum adapter around the token gate: reads the credential headers, stores
//! the caller's claims in request extensions and writes a rotated pair onto
//! the response.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::gate::{self, CredentialHeaders};
use crate::auth::jwt::{TokenIssuer, TokenPair};
use crate::error::ApiError;

/// Inbound refresh token, and outbound rotated refresh token.
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-refresh-token");
/// Outbound rotated access token.
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// Middleware guarding protected routes.
pub struct TokenGate;

impl TokenGate {
    /// Authenticate the request, renewing an expired session at most once.
    ///
    /// On rejection the downstream handler is never called.
    pub async fn require_auth(
        State(issuer): State<Arc<TokenIssuer>>,
        mut req: Request,
        next: Next,
    ) -> Response {
        let outcome = {
            let headers = req.headers();
            gate::authenticate(
                &issuer,
                CredentialHeaders {
                    authorization: header_str(headers, &header::AUTHORIZATION),
                    refresh_token: header_str(headers, &REFRESH_TOKEN_HEADER),
                },
            )
        };

        let authorized = match outcome {
            Ok(authorized) => authorized,
            Err(e) => {
                tracing::warn!(
                    "[TokenGate] rejected {} {}: {:?}",
                    req.method(),
                    req.uri().path(),
                    e.kind()
                );
                return ApiError::from(e).into_response();
            }
        };

        tracing::debug!(
            "[TokenGate] authorized user_id={} renewed={}",
            authorized.claims.identity.user_id,
            authorized.renewed.is_some()
        );
        req.extensions_mut().insert(authorized.claims.identity.clone());
        req.extensions_mut().insert(authorized.claims);

        let mut response = next.run(req).await;
        if let Some(pair) = authorized.renewed {
            if let Err(e) = attach_renewed_tokens(response.headers_mut(), &pair) {
                return e.into_response();
            }
        }
        response
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Write both rotated tokens, or neither.
fn attach_renewed_tokens(headers: &mut HeaderMap, pair: &TokenPair) -> Result<(), ApiError> {
    let access = HeaderValue::try_from(pair.access_token.as_str())
        .context("rotated access token is not a valid header value")?;
    let refresh = HeaderValue::try_from(pair.refresh_token.as_str())
        .context("rotated refresh token is not a valid header value")?;

    headers.insert(ACCESS_TOKEN_HEADER, access);
    headers.insert(REFRESH_TOKEN_HEADER, refresh);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn renewed_tokens_are_written_to_both_headers() {
        let mut headers = HeaderMap::new();
        attach_renewed_tokens(&mut headers, &pair("aaa.bbb.ccc", "ddd.eee.fff")).unwrap();

        assert_eq!(headers[&ACCESS_TOKEN_HEADER], "aaa.bbb.ccc");
        assert_eq!(headers[&REFRESH_TOKEN_HEADER], "ddd.eee.fff");
    }

    #[test]
    fn unencodable_token_fails_the_response_and_writes_nothing() {
        let mut headers = HeaderMap::new();
        let err = attach_renewed_tokens(&mut headers, &pair("aaa.bbb.ccc", "bad\nvalue"))
            .unwrap_err();

        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(headers.is_empty());
    }
}
