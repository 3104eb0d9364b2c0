// ============================================================================
// API ROUTER & SHARED ERROR MAPPING
// ============================================================================

pub mod auth;
pub mod passes;
pub mod reports;
pub mod scan;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use validator::ValidationErrors;

use crate::domains::passes::models::PassError;
use crate::middleware::auth::require_operator;
use crate::state::AppState;

pub fn create_api_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/passes", post(passes::issue_pass).get(reports::list_passes))
        .route("/passes/export", get(reports::export_csv))
        .route("/passes/:pass_id", get(passes::get_pass))
        .route("/scan", post(scan::scan_pass))
        .route("/dashboard", get(reports::dashboard_stats))
        .layer(axum_middleware::from_fn_with_state(
            app_state,
            require_operator,
        ));

    Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected)
}

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    Duplicate { name: String, phone: String },
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Validation failed",
                    "violations": violations(&errors),
                }),
            ),
            ApiError::Duplicate { name, phone } => {
                let message = format!("A pass already exists for {} with phone {}", name, phone);
                (
                    StatusCode::CONFLICT,
                    json!({
                        "success": false,
                        "error": message,
                        "holder": { "name": name, "phone": phone },
                    }),
                )
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "success": false, "error": msg }))
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "success": false, "error": msg }))
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, json!({ "success": false, "error": msg }))
            }
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PassError> for ApiError {
    fn from(err: PassError) -> Self {
        match err {
            PassError::Validation(errors) => ApiError::Validation(errors),
            PassError::DuplicateHolder { name, phone } => ApiError::Duplicate { name, phone },
            PassError::Database(msg) => {
                // Transient storage failures stay infrastructure failures;
                // they are never folded into a domain outcome.
                error!("storage failure: {}", msg);
                ApiError::InternalError("Storage failure, please retry".to_string())
            }
            PassError::Internal(msg) => {
                error!("internal error: {}", msg);
                ApiError::InternalError("Internal error".to_string())
            }
        }
    }
}

/// Flatten `ValidationErrors` into `{field: [messages]}` for the response
/// body, so every violated rule is surfaced at once.
fn violations(errors: &ValidationErrors) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = errors
        .field_errors()
        .iter()
        .map(|(field, field_errors)| {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), json!(messages))
        })
        .collect();
    serde_json::Value::Object(map)
}
