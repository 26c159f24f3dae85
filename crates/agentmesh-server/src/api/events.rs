use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use agentmesh_core::events::SimulationReport;
use agentmesh_core::ServerError;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/simulate/{event_type}", post(simulate_event))
}

/// POST /api/events/simulate/{event_type} — Broadcast a synthetic event
async fn simulate_event(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
    body: Option<Json<serde_json::Map<String, serde_json::Value>>>,
) -> Result<Json<SimulationReport>, ServerError> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    let report = state.simulate_event(&event_type, &params).await?;
    Ok(Json(report))
}
