//! Integration tests for the agentmesh-cli commands.
//!
//! These tests exercise the same code paths as the binary against a fresh
//! in-memory orchestrator with no network tiers configured. The configuration
//! is built explicitly so `AGENTMESH_*` variables in the environment do not
//! leak in.

use agentmesh_cli::commands;
use agentmesh_core::models::ExecutionStatus;
use agentmesh_core::resolver::SourceTier;
use agentmesh_core::{AppState, OrchestratorConfig};

async fn fresh_state(workflows_file: Option<&str>) -> Result<AppState, String> {
    commands::init_state_with(OrchestratorConfig::default(), workflows_file).await
}

#[tokio::test]
async fn test_workflow_list_includes_file_templates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extra.yaml");
    std::fs::write(
        &path,
        "restock_check:\n  name: Restock Check\n  agents: [inventory_agent, pricing_agent]\n",
    )
    .unwrap();

    let state = fresh_state(path.to_str()).await.unwrap();
    let templates = commands::workflow::list(&state).unwrap();
    assert_eq!(templates.len(), 5);
    assert!(templates.iter().any(|t| t.id == "restock_check"));
}

#[tokio::test]
async fn test_init_state_rejects_bad_workflow_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "not: [valid").unwrap();
    assert!(fresh_state(path.to_str()).await.is_err());
}

#[tokio::test]
async fn test_run_workflow_with_params() {
    let state = fresh_state(None).await.unwrap();
    let result = commands::workflow::run(
        &state,
        "fraud_detection",
        Some("user-7".to_string()),
        r#"{"location_mismatch": true, "new_payment_method": true}"#,
    )
    .await
    .unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.results.len(), 2);
    let fraud = serde_json::to_value(&result.results[0]).unwrap();
    assert_eq!(fraud["riskFactors"].as_array().unwrap().len(), 2);
    assert_eq!(fraud["recommendation"], "flag_for_manual_review");
}

#[tokio::test]
async fn test_run_unknown_workflow_fails() {
    let state = fresh_state(None).await.unwrap();
    let err = commands::workflow::run(&state, "not_a_workflow", None, "{}")
        .await
        .unwrap_err();
    assert!(err.contains("not_a_workflow"));
    assert_eq!(state.history_page(10).await.total_executions, 0);
}

#[tokio::test]
async fn test_run_rejects_non_object_params() {
    let state = fresh_state(None).await.unwrap();
    let err = commands::workflow::run(&state, "fraud_detection", None, "[1, 2]")
        .await
        .unwrap_err();
    assert!(err.contains("JSON object"));
}

#[tokio::test]
async fn test_resolve_uses_static_tier() {
    let state = fresh_state(None).await.unwrap();
    let resolution = commands::resolve::run(&state, "get_product", r#"{"product_id": "1YMWWN1N4O"}"#)
        .await
        .unwrap();
    assert_eq!(resolution.source, SourceTier::Static);

    assert!(commands::resolve::run(&state, "delete_everything", "{}").await.is_err());
}

#[tokio::test]
async fn test_agents_list() {
    let state = fresh_state(None).await.unwrap();
    let agents = commands::agent::list(&state).await.unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "customer_agent",
            "fraud_agent",
            "inventory_agent",
            "personalization_agent",
            "pricing_agent"
        ]
    );
}

#[tokio::test]
async fn test_serve_releases_state_on_shutdown() {
    let config = agentmesh_server::ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        workflows_file: None,
    };
    let mut bound = None;
    let state = commands::server::serve_until(
        config,
        OrchestratorConfig::default(),
        |addr| bound = Some(addr),
        async { Ok(()) },
    )
    .await
    .unwrap();

    assert!(bound.is_some_and(|addr| addr.port() != 0));
    assert!(state.registry.is_empty().await);
    assert_eq!(state.hub.count().await, 0);
}
