// ============================================================================
// SCAN ENDPOINT - verify a payload and redeem the pass behind it
// ============================================================================

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiError;
use crate::domains::passes::models::{PassSummary, RedeemOutcome};
use crate::middleware::auth::CurrentOperator;
use crate::observability::metrics::record_scan;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// The raw string read from the QR code.
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// "success" | "already_scanned"
    pub status: &'static str,
    pub message: String,
    pub pass_info: PassSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_by: Option<String>,
}

/// POST /api/v1/scan
///
/// # Returns
/// - 200 OK: `status = "success"` (this scan redeemed the pass) or
///   `status = "already_scanned"` (with who/when redeemed it first)
/// - 400 Bad Request: payload malformed or signature mismatch; one fixed
///   message regardless of the defect
/// - 404 Not Found: authentic payload but no such pass
pub async fn scan_pass(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<CurrentOperator>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    // Authenticate the payload before touching storage.
    let pass_id = match state.codec.decode(&request.payload) {
        Ok(id) => id,
        Err(_) => {
            warn!(scanned_by = %operator.username, "rejected scan payload");
            record_scan("rejected");
            return Err(ApiError::BadRequest(
                "Invalid or tampered QR code".to_string(),
            ));
        }
    };

    // The codec vouches for the binding, not for existence. An authentic id
    // that is not a UUID cannot name a pass.
    let pass_id = match Uuid::parse_str(&pass_id) {
        Ok(id) => id,
        Err(_) => {
            record_scan("not_found");
            return Err(ApiError::NotFound("Pass not found".to_string()));
        }
    };

    match state.passes.redeem(pass_id, &operator.username).await? {
        RedeemOutcome::Success(pass_info) => {
            record_scan("success");
            Ok(Json(ScanResponse {
                status: "success",
                message: "Pass scanned successfully".to_string(),
                pass_info,
                scanned_at: None,
                scanned_by: None,
            }))
        }
        RedeemOutcome::AlreadyRedeemed {
            scanned_at,
            scanned_by,
            pass,
        } => {
            info!(
                pass_id = %pass_id,
                first_scanned_by = %scanned_by,
                attempted_by = %operator.username,
                "pass already scanned"
            );
            record_scan("already_scanned");
            Ok(Json(ScanResponse {
                status: "already_scanned",
                message: "This pass has already been used".to_string(),
                pass_info: pass,
                scanned_at: Some(scanned_at),
                scanned_by: Some(scanned_by),
            }))
        }
        RedeemOutcome::NotFound => {
            record_scan("not_found");
            Err(ApiError::NotFound("Pass not found".to_string()))
        }
    }
}
