//! AgentMesh Server - Agent Workflow Orchestrator Backend
//!
//! A thin axum adapter over `agentmesh-core`, providing:
//! - RESTful HTTP API for workflows, agents, metrics and the resolver chain
//! - WebSocket subscriptions for live workflow progress
//!
//! This crate can be used standalone or embedded (the CLI's `serve`
//! command uses it).

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use agentmesh_core::workflow::WorkflowCatalog;
pub use agentmesh_core::{AppState, AppStateInner, OrchestratorConfig};

/// Configuration for the AgentMesh HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Optional YAML file with extra workflow templates.
    pub workflows_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            workflows_file: None,
        }
    }
}

/// Create a shared `AppState`: built-in workflows plus those in
/// `workflows_file`, built-in agents, and the resolver chain from `config`.
pub async fn create_app_state(
    config: OrchestratorConfig,
    workflows_file: Option<&str>,
) -> Result<AppState, String> {
    let mut catalog = WorkflowCatalog::builtin();
    if let Some(path) = workflows_file {
        let extra = WorkflowCatalog::from_file(path)?;
        tracing::info!("Loaded {} workflow templates from {}", extra.len(), path);
        catalog = catalog.merge(extra);
    }
    Ok(Arc::new(AppStateInner::bootstrap(config, catalog).await))
}

/// Start the orchestrator server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agentmesh_server=info,agentmesh_core=info,tower_http=info".into()
            }),
        )
        .try_init();

    tracing::info!(
        "Starting AgentMesh orchestrator on {}:{}",
        config.host,
        config.port
    );

    let state = create_app_state(
        OrchestratorConfig::from_env(),
        config.workflows_file.as_deref(),
    )
    .await?;

    start_server_with_state(config, state).await
}

/// Build the full router for `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/", axum::routing::get(root))
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let app = app(state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("AgentMesh orchestrator listening on {}", local_addr);

    // Spawn the server in a background task
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "agentmesh-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

async fn root(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "AgentMesh Orchestrator",
        "version": env!("CARGO_PKG_VERSION"),
        "agents": state.registry.names().await,
        "workflows": state.catalog.names(),
        "features": [
            "workflow_orchestration",
            "agent_to_agent_messaging",
            "tiered_resolver",
            "live_progress",
        ],
    }))
}
