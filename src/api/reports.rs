// ============================================================================
// LISTING, CSV EXPORT & DASHBOARD - read-only views over pass records
// ============================================================================

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::api::ApiError;
use crate::domains::passes::models::{Pass, PassListQuery, PassStats, PassView, Redemption};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PassListResponse {
    pub success: bool,
    pub passes: Vec<PassView>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: PassStats,
}

/// GET /api/v1/passes
///
/// Search and filter the pass table. `search` matches holder names and
/// phones, `scanned` is "scanned"/"unscanned", `pass_type` is
/// SINGLE/COUPLE. Paginated.
pub async fn list_passes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PassListQuery>,
) -> Result<Json<PassListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let (passes, total_count) = state.passes.list(&query).await?;
    let total_pages = (total_count + per_page - 1) / per_page;

    Ok(Json(PassListResponse {
        success: true,
        passes: passes.iter().map(PassView::from_pass).collect(),
        page,
        per_page,
        total_count,
        total_pages,
    }))
}

/// GET /api/v1/passes/export
///
/// The whole pass table as a CSV attachment, newest first.
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let passes = state.passes.export_all().await?;
    let csv = passes_to_csv(&passes);

    let filename = format!("epass_database_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(csv))
        .map_err(|e| ApiError::InternalError(format!("Failed to build CSV response: {}", e)))
}

/// GET /api/v1/dashboard
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let stats = state.passes.stats().await?;
    Ok(Json(DashboardResponse {
        success: true,
        stats,
    }))
}

fn passes_to_csv(passes: &[Pass]) -> String {
    let mut csv = "Pass ID,Name 1,Phone 1,Name 2,Phone 2,Pass Type,Amount,Payment Mode,\
                   Transaction Info,Timing,Created At,Scanned At,Scanned By\n"
        .to_string();

    for pass in passes {
        let primary = pass.holders.primary();
        let second = pass.holders.second();
        let (scanned_at, scanned_by) = match &pass.redemption {
            Redemption::Redeemed { at, by } => (at.to_rfc3339(), by.clone()),
            Redemption::Unredeemed => (String::new(), String::new()),
        };

        csv.push_str(&format!(
            "{},\"{}\",{},\"{}\",{},{},{},{},\"{}\",\"{}\",{},{},{}\n",
            pass.id,
            quote(&primary.name),
            primary.phone,
            quote(second.map(|h| h.name.as_str()).unwrap_or("")),
            second.map(|h| h.phone.as_str()).unwrap_or(""),
            pass.kind().as_str(),
            pass.amount,
            pass.payment.mode.as_str(),
            quote(pass.payment.txn_info.as_deref().unwrap_or("")),
            quote(&pass.timing),
            pass.created_at.to_rfc3339(),
            scanned_at,
            scanned_by,
        ));
    }

    csv
}

fn quote(value: &str) -> String {
    value.replace('"', "\"\"")
}
