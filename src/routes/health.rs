use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde_json::{Value, json};

use crate::server::AppState;

/// `GET /`
pub async fn root() -> &'static str {
    "Backend running — welcome!"
}

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/api/health`
///
/// # Response Format
/// ```json
/// {
///   "status": "OK",
///   "message": "Server is running",
///   "timestamp": "2025-01-01T00:00:00Z"
/// }
/// ```
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Storage connectivity check, only mounted for the PostgreSQL backend.
pub async fn test_db(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.users.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "OK", "message": "Database connection successful" })),
        ),
        Err(e) => {
            tracing::error!("Database health check failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "ERROR",
                    "message": "Database connection failed",
                    "error": e.to_string(),
                })),
            )
        }
    }
}
