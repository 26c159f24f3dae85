use axum::{extract::State, routing::get, Json, Router};

use agentmesh_core::models::{SystemMetrics, SystemStatus};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/metrics", get(metrics))
}

async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.status().await)
}

async fn metrics(State(state): State<AppState>) -> Json<SystemMetrics> {
    Json(state.metrics().await)
}
