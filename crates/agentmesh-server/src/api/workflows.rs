use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use agentmesh_core::models::{HistoryPage, WorkflowRequest, WorkflowResult};
use agentmesh_core::ServerError;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workflows))
        .route("/history", get(history))
        .route("/running", get(running))
        .route("/executions/{id}/cancel", post(cancel_execution))
        .route("/{name}", post(execute_workflow))
}

async fn list_workflows(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "workflows": state.catalog.all(),
        "count": state.catalog.len(),
    }))
}

/// POST /api/workflows/{name} — Run a workflow to completion
///
/// The run is spawned so a client disconnect does not abandon it halfway.
async fn execute_workflow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<WorkflowRequest>>,
) -> Result<Json<WorkflowResult>, ServerError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let result = tokio::spawn(async move { state.engine.execute(&name, request).await })
        .await
        .map_err(|e| ServerError::Internal(format!("Workflow task failed: {}", e)))??;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<HistoryPage> {
    Json(state.history_page(q.limit.unwrap_or(10)).await)
}

async fn running(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "running": state.engine.running().await }))
}

/// POST /api/workflows/executions/{id}/cancel — Stop a run at its next step boundary
async fn cancel_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if state.engine.cancel(&id).await {
        Ok(Json(serde_json::json!({ "cancelled": true, "workflowId": id })))
    } else {
        Err(ServerError::NotFound(format!("No running execution {}", id)))
    }
}
