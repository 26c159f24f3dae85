//! `agentmesh serve` — Start the orchestrator HTTP server.

use std::future::Future;
use std::net::SocketAddr;

use agentmesh_core::{AppState, OrchestratorConfig};

pub async fn run(host: String, port: u16, workflows_file: Option<String>) -> Result<(), String> {
    let config = agentmesh_server::ServerConfig {
        host,
        port,
        workflows_file,
    };

    let interrupted = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))
    };
    serve_until(
        config,
        OrchestratorConfig::from_env(),
        |addr| println!("AgentMesh listening on http://{}", addr),
        interrupted,
    )
    .await
    .map(|_| ())
}

/// Serve until `shutdown` resolves, then release the orchestrator state.
///
/// Returns the state after shutdown so callers can inspect it.
pub async fn serve_until<F>(
    config: agentmesh_server::ServerConfig,
    orchestrator: OrchestratorConfig,
    on_listening: impl FnOnce(SocketAddr),
    shutdown: F,
) -> Result<AppState, String>
where
    F: Future<Output = Result<(), String>>,
{
    println!("Starting AgentMesh on {}:{}...", config.host, config.port);

    let state =
        agentmesh_server::create_app_state(orchestrator, config.workflows_file.as_deref()).await?;
    let addr = agentmesh_server::start_server_with_state(config, state.clone()).await?;
    on_listening(addr);

    // Keep the process running until interrupted
    let signal = shutdown.await;

    println!("\nShutting down...");
    state.shutdown().await;
    signal.map(|_| state)
}
