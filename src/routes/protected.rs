use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::auth::models::Claims;

/// `GET /api/protected-route`, echoes the caller's verified token payload.
pub async fn protected_route(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({
        "message": "This is a protected route",
        "user": claims,
    }))
}
