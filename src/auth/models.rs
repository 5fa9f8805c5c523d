//! Authentication Models
//!
//! Identity claims carried inside tokens, plus the request and response
//! payloads used by the signup and login endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Marketplace role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of `buyer`, `seller`, `admin`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Identity attributes embedded in both the access and the refresh token.
///
/// This is also what protected handlers receive through request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

/// Full JWT payload: identity claims plus registered time claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiration, seconds since epoch
    pub exp: i64,
}

/// Read any JSON scalar as text; `null` and a missing key are `None`.
///
/// A number or boolean where a string is expected reaches the handler's own
/// validation (`{"email": 5}` is an invalid email, not a body rejection).
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Signup request payload
///
/// Every field is optional at the wire level so missing fields produce the
/// endpoint's own 400 message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub role: Option<String>,
}

/// Login request payload
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub password: Option<String>,
}

/// Public view of an account, never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Body returned by signup and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_use_camel_case_payload_keys() {
        let claims = Claims {
            identity: IdentityClaims {
                user_id: 7,
                email: "ann@example.com".to_string(),
                role: Role::Seller,
            },
            iat: 100,
            exp: 1000,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["email"], "ann@example.com");
        assert_eq!(value["role"], "seller");
        assert_eq!(value["iat"], 100);
        assert_eq!(value["exp"], 1000);
    }

    #[test]
    fn request_fields_accept_non_string_scalars() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"email": 5, "password": true, "name": null}"#,
        )
        .unwrap();
        assert_eq!(req.email.as_deref(), Some("5"));
        assert_eq!(req.password.as_deref(), Some("true"));
        assert_eq!(req.name, None);
        assert_eq!(req.role, None);

        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_none() && req.password.is_none());
    }

    #[test]
    fn role_parses_only_known_names() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("buyer".parse::<Role>(), Ok(Role::Buyer));
        assert!("Admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
