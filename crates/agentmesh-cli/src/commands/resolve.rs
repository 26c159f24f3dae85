//! `agentmesh resolve` — Query the resolver chain directly.

use agentmesh_core::resolver::{Capability, Resolution};
use agentmesh_core::AppState;

use super::parse_params;

pub async fn run(state: &AppState, capability: &str, params: &str) -> Result<Resolution, String> {
    let capability = Capability::from_str(capability)
        .ok_or_else(|| format!("Unknown capability: {}", capability))?;
    let params = serde_json::Value::Object(parse_params(params)?);

    let resolution = state.resolver.resolve(capability, &params).await;
    println!(
        "Answered by {} ({} tier)",
        resolution.backend,
        resolution.source.as_str()
    );
    let rendered = serde_json::to_string_pretty(&resolution.data)
        .map_err(|e| format!("Failed to render result: {}", e))?;
    println!("{}", rendered);
    Ok(resolution)
}
