//! `agentmesh workflows` / `agentmesh run` — Inspect and execute workflows.

use agentmesh_core::models::{WorkflowRequest, WorkflowResult, WorkflowTemplate};
use agentmesh_core::{AppState, ServerError};

use super::parse_params;

/// Print the workflow catalog.
pub fn list(state: &AppState) -> Result<Vec<WorkflowTemplate>, String> {
    let templates = state.catalog.all();
    println!("{:<26} {:<36} AGENTS", "ID", "NAME");
    for t in &templates {
        println!("{:<26} {:<36} {}", t.id, t.name, t.agents.join(" → "));
    }
    println!("\n{} workflow(s)", templates.len());
    Ok(templates)
}

/// Execute one workflow and print its per-step results.
pub async fn run(
    state: &AppState,
    name: &str,
    user_id: Option<String>,
    params: &str,
) -> Result<WorkflowResult, String> {
    let request = WorkflowRequest {
        user_id,
        parameters: parse_params(params)?,
        ..WorkflowRequest::default()
    };

    match state.engine.execute(name, request).await {
        Ok(result) => {
            println!("Workflow {} ({})", result.workflow_id, result.template.name);
            for (i, step) in result.results.iter().enumerate() {
                println!(
                    "  {}. {:<22} {:<24} confidence {:.2}",
                    i + 1,
                    step.agent,
                    step.action,
                    step.confidence
                );
            }
            println!("\n{}", result.summary);
            Ok(result)
        }
        Err(ServerError::WorkflowFailed {
            workflow_id,
            message,
            partial_results,
        }) => Err(format!(
            "Workflow {} failed after {} step(s): {}",
            workflow_id,
            partial_results.len(),
            message
        )),
        Err(e) => Err(e.to_string()),
    }
}
