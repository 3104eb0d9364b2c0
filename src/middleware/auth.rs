//! Operator session middleware.
//!
//! The core never authenticates operators itself; this layer turns a Bearer
//! JWT into a [`CurrentOperator`] extension, and everything behind it simply
//! receives an already-authenticated operator identity.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::api::ApiError;
use crate::state::AppState;

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an operator session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OperatorClaims {
    pub sub: String, // username
    pub display_name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated operator identity, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentOperator {
    pub username: String,
    pub display_name: Option<String>,
}

pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        warn!("missing or malformed Authorization header");
        ApiError::Unauthorized("Missing or malformed Authorization header".to_string())
    })?;

    let token_data = decode::<OperatorClaims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::new(JWT_ALGORITHM),
    )
    .map_err(|e| {
        warn!("operator token rejected: {}", e);
        ApiError::Unauthorized("Invalid or expired session token".to_string())
    })?;

    request.extensions_mut().insert(CurrentOperator {
        username: token_data.claims.sub,
        display_name: token_data.claims.display_name,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
