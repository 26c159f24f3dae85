pub mod agents;
pub mod events;
pub mod resolver;
pub mod status;
pub mod workflows;
pub mod ws;

use axum::Router;

use crate::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/agents", agents::router())
        .nest("/api/events", events::router())
        .nest("/api/workflows", workflows::router())
        .nest("/api/resolver", resolver::router())
        .merge(status::router())
        .route("/ws/{client_id}", axum::routing::get(ws::subscribe))
}
