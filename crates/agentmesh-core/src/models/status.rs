use serde::Serialize;

use crate::models::{AgentInfo, HistoryStats, WorkflowTemplate};
use crate::resolver::EndpointStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub system_status: String,
    pub active_agents: usize,
    pub active_connections: usize,
    pub running_workflows: usize,
    pub total_workflows_executed: u64,
    pub agents: Vec<AgentInfo>,
    pub workflow_templates: Vec<WorkflowTemplate>,
    pub endpoints: Vec<EndpointStatus>,
    pub ai_model_available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAggregate {
    pub total_agents: usize,
    pub total_messages_processed: u64,
    /// Mean of the per-agent rolling success rates that have been observed.
    pub average_success_rate: Option<f64>,
    pub most_active_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub workflow_metrics: HistoryStats,
    pub agent_metrics: AgentAggregate,
    pub active_subscribers: usize,
    pub running_workflows: usize,
    pub ai_model_available: bool,
}
