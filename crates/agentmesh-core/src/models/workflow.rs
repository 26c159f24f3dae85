use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resolver::SourceTier;

// ─── Templates ─────────────────────────────────────────────────────────────

/// A named, ordered list of agents to run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    /// Catalog key. Filled from the map key when loaded from YAML.
    #[serde(default)]
    pub id: String,
    /// Human label
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Agent references, executed in order
    pub agents: Vec<String>,
    /// Step labels; informational, may be longer or shorter than `agents`
    #[serde(default)]
    pub steps: Vec<String>,
}

impl WorkflowTemplate {
    pub fn new(id: &str, name: &str, description: &str, agents: &[&str], steps: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            agents: agents.iter().map(|s| s.to_string()).collect(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Label for the step at `index`, falling back to the agent name.
    pub fn step_label(&self, index: usize) -> &str {
        self.steps
            .get(index)
            .or_else(|| self.agents.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ─── Requests ──────────────────────────────────────────────────────────────

/// Advisory priority hint; not used for scheduling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub priority: Priority,
}

// ─── Step results ──────────────────────────────────────────────────────────

/// Output of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub agent: String,
    pub action: String,
    /// Human-readable message
    pub result: String,
    /// In `[0, 1]`
    pub confidence: f64,
    pub processing_time_ms: u64,
    /// Which resolver tier supplied the data this step relied on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<SourceTier>,
    #[serde(flatten)]
    pub findings: RoleFindings,
}

/// Role-specific fields of a step result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RoleFindings {
    Pricing(PricingFindings),
    Inventory(InventoryFindings),
    Customer(CustomerFindings),
    Fraud(FraudFindings),
    Personalization(PersonalizationFindings),
    Generic(GenericFindings),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingFindings {
    pub discount_percentage: u32,
    pub optimization_reason: String,
    pub estimated_savings: f64,
    /// Unix timestamp (seconds)
    pub price_valid_until: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFindings {
    pub stock_level: u64,
    pub reorder_needed: bool,
    pub demand_forecast: f64,
    pub availability_score: f64,
    pub recommended_action: String,
    pub products_tracked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFindings {
    pub segment: String,
    pub behavior_pattern: String,
    pub lifetime_value: u64,
    pub churn_risk: f64,
    pub recommended_engagement: String,
    pub cart_items: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FraudFindings {
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationFindings {
    pub recommendation_strength: f64,
    pub content_type: String,
    pub target_segments: Vec<String>,
    pub expected_engagement_lift: f64,
    pub recommended_products: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenericFindings {}

// ─── Results & history ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// What the caller of a successful execution gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub template: WorkflowTemplate,
    pub agents_involved: usize,
    pub summary: String,
    pub results: Vec<StepResult>,
    /// Sum of the per-step processing times
    pub execution_time_ms: u64,
}

/// Immutable record appended to the execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: String,
    pub name: String,
    pub template: WorkflowTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub parameters: Map<String, Value>,
    /// Step results; partial when `status` is `failed`.
    pub results: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub workflows: Vec<WorkflowExecution>,
    pub total_executions: u64,
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_flattens_findings() {
        let step = StepResult {
            agent: "fraud_agent".to_string(),
            action: "fraud_assessment".to_string(),
            result: "Security analysis for x".to_string(),
            confidence: 0.8,
            processing_time_ms: 3,
            data_source: None,
            findings: RoleFindings::Fraud(FraudFindings {
                risk_score: 0.3,
                risk_factors: vec!["new_payment_method".to_string()],
                recommendation: "request_additional_verification".to_string(),
            }),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["riskScore"], 0.3);
        assert_eq!(json["agent"], "fraud_agent");
        assert!(json.get("dataSource").is_none());

        let back: StepResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_step_label_falls_back_to_agent() {
        let t = WorkflowTemplate::new("t", "T", "", &["a", "b"], &["first"]);
        assert_eq!(t.step_label(0), "first");
        assert_eq!(t.step_label(1), "b");
        assert_eq!(t.step_label(5), "");
    }

    #[test]
    fn test_request_defaults() {
        let req: WorkflowRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_id.is_none());
        assert!(req.parameters.is_empty());
        assert_eq!(req.priority, Priority::Normal);
    }
}
