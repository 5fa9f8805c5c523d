//! Auth routes for signup and login
//!
//! Both endpoints mint the initial access/refresh pair; everything after
//! that is renewed by the token gate.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::auth::models::{AuthResponse, LoginRequest, Role, SignupRequest};
use crate::auth::password::{hash_password, verify_password};
use crate::database::NewUser;
use crate::error::ApiError;
use crate::server::AppState;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MIN_PASSWORD_LEN: usize = 6;
const INVALID_LOGIN: &str = "Invalid email or password";

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Length in UTF-16 code units, as browsers count it for the same rule.
fn password_len(password: &str) -> usize {
    password.encode_utf16().count()
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password), Some(name)) = (
        present(payload.email),
        present(payload.password),
        present(payload.name),
    ) else {
        return Err(ApiError::bad_request(
            "Email, password, and name are required",
        ));
    };

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if password_len(&password) < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters long",
        ));
    }

    let role = match present(payload.role) {
        None => Role::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::bad_request("Invalid role"))?,
    };

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("User with this email already exists"));
    }

    let user = state
        .users
        .create(NewUser {
            email,
            name,
            password_hash: hash_password(&password)?,
            role,
        })
        .await?;

    let tokens = state.issuer.issue(&user.identity_claims())?;
    tracing::info!(user_id = user.id, role = %user.role, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.to_public(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password)) = (present(payload.email), present(payload.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        tracing::warn!("login attempt for unknown account");
        return Err(ApiError::unauthorized(INVALID_LOGIN));
    };

    if !verify_password(&password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "login attempt with wrong password");
        return Err(ApiError::unauthorized(INVALID_LOGIN));
    }

    let tokens = state.issuer.issue(&user.identity_claims())?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: user.to_public(),
    }))
}

/// Lists accounts without password hashes. Never mounted in production.
pub async fn debug_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let users: Vec<_> = state
        .users
        .list()
        .await?
        .iter()
        .map(|u| u.to_public())
        .collect();

    Ok(Json(json!({
        "count": users.len(),
        "users": users,
    })))
}

pub fn create_auth_routes(include_debug: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login));

    if include_debug {
        router.route("/api/auth/debug/users", get(debug_users))
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a.b+c@shop.co.uk"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("ann example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ann@@example.com"));
    }

    #[test]
    fn password_length_counts_utf16_units() {
        assert_eq!(password_len("secret"), 6);
        assert_eq!(password_len("😀😀😀"), 6);
        assert_eq!(password_len("é"), 1);
    }
}
