use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use agentmesh_core::resolver::{Capability, Resolution};
use agentmesh_core::ServerError;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/{capability}", post(resolve))
}

/// GET /api/resolver/health — Probe every tier
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tiers = state.resolver.health_check().await;
    Json(serde_json::json!({
        "tiers": tiers,
        "endpoints": state.resolver.endpoints().await,
        "timestamp": chrono::Utc::now(),
    }))
}

/// POST /api/resolver/{capability} — Resolve through the tier chain
async fn resolve(
    State(state): State<AppState>,
    Path(capability): Path<String>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<Resolution>, ServerError> {
    let capability = Capability::from_str(&capability)
        .ok_or_else(|| ServerError::BadRequest(format!("Unknown capability: {}", capability)))?;
    let params = body.map(|Json(v)| v).unwrap_or(serde_json::Value::Null);
    Ok(Json(state.resolver.resolve(capability, &params).await))
}
