pub mod agent;
pub mod resolve;
pub mod server;
pub mod workflow;

use agentmesh_core::{AppState, OrchestratorConfig};

/// Build orchestrator state for one-shot commands: configuration from the
/// environment, simulated latency off.
pub async fn init_state(workflows_file: Option<&str>) -> Result<AppState, String> {
    init_state_with(OrchestratorConfig::from_env(), workflows_file).await
}

/// Same as [`init_state`] with an explicit configuration.
pub async fn init_state_with(
    config: OrchestratorConfig,
    workflows_file: Option<&str>,
) -> Result<AppState, String> {
    tracing::debug!("Initializing orchestrator state (workflows file: {:?})", workflows_file);
    agentmesh_server::create_app_state(config.without_delays(), workflows_file).await
}

/// Parse a `--params` argument into a JSON object.
pub fn parse_params(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("--params must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid --params JSON: {}", e)),
    }
}
