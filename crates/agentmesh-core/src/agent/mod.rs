//! Agents — named, role-bearing workers that process one unit of work at a
//! time and keep rolling usage statistics.

mod metrics;
pub mod processor;

pub use processor::{processor_for, AgentError, RoleProcessor, StepOutcome};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::models::{AgentInfo, AgentRole, MessageBody, StepResult};
use crate::resolver::ResolverChain;
use metrics::RollingStats;

/// Everything an agent may look at while processing a task.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub workflow_id: Option<String>,
    /// 1-based position within the workflow
    pub step: Option<usize>,
    pub total_steps: Option<usize>,
    pub user_id: Option<String>,
    pub parameters: Map<String, Value>,
    /// Results of the steps already completed in the same execution.
    pub previous_results: Vec<StepResult>,
    /// Set when the task is an agent-to-agent message.
    pub message: Option<MessageBody>,
    pub from_agent: Option<String>,
}

impl TaskContext {
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        })
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(Value::as_f64)
    }

    pub fn param_bool(&self, key: &str) -> bool {
        self.parameters
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

pub struct Agent {
    name: String,
    role: AgentRole,
    capabilities: BTreeSet<String>,
    accepts_messages: bool,
    processor: Box<dyn RoleProcessor>,
    resolver: Option<Arc<ResolverChain>>,
    latency: Duration,
    stats: Mutex<RollingStats>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("accepts_messages", &self.accepts_messages)
            .finish()
    }
}

impl Agent {
    /// Create an agent with the built-in processor for `role`.
    pub fn new(name: &str, role: AgentRole, capabilities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            role,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            accepts_messages: true,
            processor: processor_for(role),
            resolver: None,
            latency: Duration::ZERO,
            stats: Mutex::new(RollingStats::default()),
        }
    }

    /// Replace the processor. The agent's role follows the processor.
    pub fn with_processor(mut self, processor: Box<dyn RoleProcessor>) -> Self {
        self.role = processor.role();
        self.processor = processor;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<ResolverChain>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Simulated processing latency applied to every invocation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Opt out of agent-to-agent messaging.
    pub fn without_messaging(mut self) -> Self {
        self.accepts_messages = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn accepts_messages(&self) -> bool {
        self.accepts_messages
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Run one task. Statistics are updated whether or not it succeeds.
    pub async fn process(&self, task: &str, ctx: &TaskContext) -> Result<StepResult, AgentError> {
        self.stats.lock().await.begin();
        let started = Instant::now();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self
            .processor
            .process(task, ctx, self.resolver.as_deref())
            .await;

        let elapsed = started.elapsed();
        self.stats.lock().await.record(outcome.is_ok(), elapsed);

        match outcome {
            Ok(out) => Ok(StepResult {
                agent: self.name.clone(),
                action: out.action,
                result: out.result,
                confidence: out.confidence.clamp(0.0, 1.0),
                processing_time_ms: elapsed.as_millis() as u64,
                data_source: out.data_source,
                findings: out.findings,
            }),
            Err(e) => {
                tracing::warn!("[Agent] {} failed on '{}': {}", self.name, task, e);
                Err(e)
            }
        }
    }

    /// Handle an agent-to-agent message as a task named after the sender.
    pub async fn handle_message(
        &self,
        from_agent: &str,
        body: &MessageBody,
    ) -> Result<StepResult, AgentError> {
        let ctx = TaskContext {
            parameters: body.payload.clone(),
            message: Some(body.clone()),
            from_agent: Some(from_agent.to_string()),
            user_id: body
                .payload
                .get("user_id")
                .and_then(Value::as_str)
                .map(String::from),
            ..TaskContext::default()
        };
        self.process(&format!("message_from_{}", from_agent), &ctx)
            .await
    }

    pub async fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name.clone(),
            role: self.role,
            capabilities: self.capabilities.iter().cloned().collect(),
            accepts_messages: self.accepts_messages,
            status: "active".to_string(),
            metrics: self.stats.lock().await.snapshot(),
        }
    }
}

/// The five specialist agents every orchestrator starts with.
pub fn builtin_roster() -> Vec<Agent> {
    vec![
        Agent::new(
            "pricing_agent",
            AgentRole::Pricing,
            &["dynamic_pricing", "competitor_analysis", "discount_optimization"],
        ),
        Agent::new(
            "inventory_agent",
            AgentRole::Inventory,
            &["stock_management", "demand_forecasting", "supply_optimization"],
        ),
        Agent::new(
            "customer_agent",
            AgentRole::Customer,
            &["profile_analysis", "behavior_prediction", "segmentation"],
        ),
        Agent::new(
            "fraud_agent",
            AgentRole::Fraud,
            &["risk_assessment", "transaction_monitoring", "pattern_detection"],
        ),
        Agent::new(
            "personalization_agent",
            AgentRole::Personalization,
            &["content_curation", "recommendation_engine", "experience_optimization"],
        ),
    ]
}
