use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod domains;
pub mod middleware;
pub mod state;

// Production-ready modules
pub mod monitoring;
pub mod observability;

use api::create_api_router;
use monitoring::endpoints::monitoring_router;
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Monitoring endpoints (no authentication)
        .merge(monitoring_router())
        // API endpoints; operator auth is layered inside
        .nest("/api/v1", create_api_router(app_state.clone()))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
