//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, except the unauthenticated `/health`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat
        .route(
            "/agents/{agent_id}/chat",
            post(handlers::chat::send_message),
        )
        // Metrics
        .route("/metrics/overall", get(handlers::metrics::overall_metrics))
        .route("/metrics/{agent_id}", get(handlers::metrics::agent_metrics))
        // Live metrics
        .route("/ws/metrics", get(handlers::ws::metrics_ws));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus the number of running live-metrics tickers.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "live_tickers": state.hub.active_tickers(),
    }))
}
