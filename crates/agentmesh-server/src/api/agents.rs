use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use agentmesh_core::models::{
    AgentMessage, AgentMessageResponse, BroadcastMessage, BroadcastReport,
};
use agentmesh_core::ServerError;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents))
        .route("/message", post(send_message))
        .route("/broadcast", post(broadcast))
}

async fn list_agents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let agents = state.registry.list().await;
    Json(serde_json::json!({
        "count": agents.len(),
        "agents": agents,
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Json(message): Json<AgentMessage>,
) -> Result<Json<AgentMessageResponse>, ServerError> {
    Ok(Json(state.relay.send(message).await?))
}

async fn broadcast(
    State(state): State<AppState>,
    Json(message): Json<BroadcastMessage>,
) -> Result<Json<BroadcastReport>, ServerError> {
    Ok(Json(state.relay.broadcast(message).await?))
}
