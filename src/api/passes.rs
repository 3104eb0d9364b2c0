// ============================================================================
// PASS ISSUANCE & PREVIEW
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::domains::passes::models::{IssuePassRequest, PassView};
use crate::middleware::auth::CurrentOperator;
use crate::observability::metrics::record_pass_issued;
use crate::state::AppState;

/// POST /api/v1/passes
///
/// Issue a new pass. The amount is derived from the pass type server-side;
/// the response carries the full record plus its scannable payload.
///
/// # Returns
/// - 201 Created: the new pass, including `qr_payload`
/// - 400 Bad Request: one or more field rules violated (all listed)
/// - 409 Conflict: a pass already exists for this primary holder
pub async fn issue_pass(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<CurrentOperator>,
    Json(payload): Json<IssuePassRequest>,
) -> Result<(StatusCode, Json<PassView>), ApiError> {
    let pass = state.passes.create(payload).await?;
    record_pass_issued(pass.kind().as_str());
    info!(
        pass_id = %pass.id,
        issued_by = %operator.username,
        pass_type = %pass.kind().as_str(),
        "pass issued"
    );

    let qr_payload = state.codec.encode(&pass.id.to_string());
    Ok((
        StatusCode::CREATED,
        Json(PassView::with_token(&pass, qr_payload)),
    ))
}

/// GET /api/v1/passes/:pass_id
///
/// Preview an existing pass. The payload is re-derived from the stored id,
/// so "regenerating" a pass always yields the identical scannable code.
pub async fn get_pass(
    State(state): State<Arc<AppState>>,
    Path(pass_id): Path<Uuid>,
) -> Result<Json<PassView>, ApiError> {
    let pass = state
        .passes
        .get(pass_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pass not found".to_string()))?;

    let qr_payload = state.codec.encode(&pass.id.to_string());
    Ok(Json(PassView::with_token(&pass, qr_payload)))
}
