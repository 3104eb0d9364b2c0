use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;

/// Monitoring router: health and Prometheus metrics, no authentication.
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
}

/// Health check with a database probe.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(_) => "healthy".to_string(),
        Err(e) => {
            error!("health check database probe failed: {}", e);
            format!("error: {}", e)
        }
    };

    let healthy = database == "healthy";
    let body = serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "epass_rust_ws",
    });

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(body))
}

async fn prometheus_metrics() -> impl IntoResponse {
    crate::observability::metrics_handler().await
}
