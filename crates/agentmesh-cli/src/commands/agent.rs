//! `agentmesh agents` — Show the agent roster.

use agentmesh_core::models::AgentInfo;
use agentmesh_core::AppState;

pub async fn list(state: &AppState) -> Result<Vec<AgentInfo>, String> {
    let agents = state.registry.list().await;
    println!("{:<24} {:<16} CAPABILITIES", "NAME", "ROLE");
    for a in &agents {
        println!("{:<24} {:<16} {}", a.name, a.role.as_str(), a.capabilities.join(", "));
    }
    Ok(agents)
}
