// ============================================================================
// OPERATOR LOGIN
// ============================================================================

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use crate::api::ApiError;
use crate::middleware::auth::OperatorClaims;
use crate::state::AppState;

const SESSION_HOURS: i64 = 24;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub display_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct AdminRow {
    username: String,
    password_hash: String,
    display_name: Option<String>,
}

/// POST /api/v1/auth/login
///
/// Verifies the operator's credentials against the `admins` table and issues
/// a 24-hour session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;
    let username = payload.username.trim();

    let admin = sqlx::query_as::<_, AdminRow>(
        "SELECT username, password_hash, display_name FROM admins WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        error!("login lookup failed: {}", e);
        ApiError::InternalError("Storage failure, please retry".to_string())
    })?
    .ok_or_else(|| {
        warn!(username = %username, "login attempt for unknown operator");
        ApiError::Unauthorized("Invalid username or password".to_string())
    })?;

    let password_ok = bcrypt::verify(&payload.password, &admin.password_hash).map_err(|e| {
        error!("bcrypt verification failed: {}", e);
        ApiError::InternalError("Internal error".to_string())
    })?;
    if !password_ok {
        warn!(username = %admin.username, "failed login attempt");
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let now = Utc::now();
    let claims = OperatorClaims {
        sub: admin.username.clone(),
        display_name: admin.display_name.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(SESSION_HOURS)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("JWT encoding error: {}", e);
        ApiError::InternalError("Internal error".to_string())
    })?;

    info!(username = %admin.username, "operator logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        display_name: admin.display_name,
    }))
}
