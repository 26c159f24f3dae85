//! Workflow engine — runs a template's agents in order.
//!
//! For each agent reference the engine:
//! 1. Looks the agent up in the registry (missing agents are skipped)
//! 2. Runs it with the parameters and the results of earlier steps
//! 3. Publishes a `workflow_progress` event
//! 4. Waits the inter-step delay, or stops early when cancelled
//!
//! Every started run ends with exactly one history record: `completed` with
//! all results, or `failed` with the results gathered so far. A run whose
//! future is dropped mid-flight is recorded as `failed` by [`RunGuard`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::catalog::WorkflowCatalog;
use super::history::ExecutionHistory;
use super::summary::{summarize, SummaryGenerator};
use crate::agent::TaskContext;
use crate::error::ServerError;
use crate::events::{HubEvent, SubscriberHub};
use crate::models::{
    ExecutionStatus, StepResult, WorkflowExecution, WorkflowRequest, WorkflowResult,
    WorkflowTemplate,
};
use crate::registry::AgentRegistry;

const CANCELLED_MESSAGE: &str = "Execution cancelled";
const ABORTED_MESSAGE: &str = "Execution aborted";

/// An execution that has started and not yet finished.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningWorkflow {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

struct RunningEntry {
    info: RunningWorkflow,
    token: CancellationToken,
}

type RunningTable = Mutex<HashMap<String, RunningEntry>>;

fn lock_running(running: &RunningTable) -> MutexGuard<'_, HashMap<String, RunningEntry>> {
    running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the bookkeeping of one started run.
///
/// Dropping the guard always removes the running entry. If no outcome was
/// recorded yet, the pending record is stored as `failed` with the results
/// gathered so far.
struct RunGuard<'a> {
    running: &'a RunningTable,
    history: Arc<RwLock<ExecutionHistory>>,
    record: WorkflowExecution,
    clock: Instant,
    recorded: bool,
}

impl RunGuard<'_> {
    /// Append `record` and disarm the guard.
    async fn commit(&mut self, record: WorkflowExecution) {
        let mut history = self.history.write().await;
        history.append(record);
        self.recorded = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        lock_running(self.running).remove(&self.record.id);
        if self.recorded {
            return;
        }

        let mut record = self.record.clone();
        record.status = ExecutionStatus::Failed;
        record.error = Some(ABORTED_MESSAGE.to_string());
        record.duration_ms = self.clock.elapsed().as_millis() as u64;
        tracing::warn!(
            "[Workflow] {} dropped after {} steps",
            record.id,
            record.results.len()
        );

        if let Ok(mut history) = self.history.try_write() {
            history.append(record);
        } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let history = self.history.clone();
            handle.spawn(async move {
                history.write().await.append(record);
            });
        }
    }
}

pub struct WorkflowEngine {
    catalog: Arc<WorkflowCatalog>,
    registry: Arc<AgentRegistry>,
    hub: Arc<SubscriberHub>,
    history: Arc<RwLock<ExecutionHistory>>,
    summarizer: Option<Arc<dyn SummaryGenerator>>,
    inter_step_delay: Duration,
    running: RunningTable,
}

impl WorkflowEngine {
    pub fn new(
        catalog: Arc<WorkflowCatalog>,
        registry: Arc<AgentRegistry>,
        hub: Arc<SubscriberHub>,
        history: Arc<RwLock<ExecutionHistory>>,
    ) -> Self {
        Self {
            catalog,
            registry,
            hub,
            history,
            summarizer: None,
            inter_step_delay: Duration::ZERO,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn SummaryGenerator>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_inter_step_delay(mut self, delay: Duration) -> Self {
        self.inter_step_delay = delay;
        self
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    /// Execute the template registered under `name`.
    ///
    /// An unknown name fails with `NotFound` before anything is recorded.
    /// Callers that may drop this future early (HTTP handlers) should run it
    /// on its own task so the run still reaches its outcome.
    pub async fn execute(
        &self,
        name: &str,
        request: WorkflowRequest,
    ) -> Result<WorkflowResult, ServerError> {
        let template = self
            .catalog
            .get(name)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(format!("Workflow '{}' not found", name)))?;

        let workflow_id = new_workflow_id(name);
        let started_at = Utc::now();
        let token = CancellationToken::new();

        lock_running(&self.running).insert(
            workflow_id.clone(),
            RunningEntry {
                info: RunningWorkflow {
                    id: workflow_id.clone(),
                    name: name.to_string(),
                    started_at,
                },
                token: token.clone(),
            },
        );
        let mut guard = RunGuard {
            running: &self.running,
            history: self.history.clone(),
            record: WorkflowExecution {
                id: workflow_id.clone(),
                name: name.to_string(),
                template: template.clone(),
                user_id: request.user_id.clone(),
                parameters: request.parameters.clone(),
                results: Vec::new(),
                summary: None,
                status: ExecutionStatus::Completed,
                started_at,
                duration_ms: 0,
                error: None,
            },
            clock: Instant::now(),
            recorded: false,
        };
        tracing::info!(
            "[Workflow] Starting {} ({}, {} agents)",
            workflow_id,
            name,
            template.agents.len()
        );

        let outcome = self
            .run_steps(
                &workflow_id,
                name,
                &template,
                &request,
                &token,
                &mut guard.record.results,
            )
            .await;
        lock_running(&self.running).remove(&workflow_id);

        let results = guard.record.results.clone();
        match outcome {
            Ok(()) => {
                let summary = summarize(self.summarizer.as_deref(), name, &results).await;
                let execution_time_ms = results.iter().map(|r| r.processing_time_ms).sum();

                let mut record = guard.record.clone();
                record.summary = Some(summary.clone());
                record.duration_ms = guard.clock.elapsed().as_millis() as u64;
                guard.commit(record).await;

                self.hub
                    .publish(HubEvent::WorkflowCompleted {
                        workflow_id: workflow_id.clone(),
                        workflow_name: name.to_string(),
                        summary: summary.clone(),
                        total_agents: results.len(),
                        timestamp: Utc::now(),
                    })
                    .await;
                tracing::info!(
                    "[Workflow] {} completed with {} results",
                    workflow_id,
                    results.len()
                );

                Ok(WorkflowResult {
                    workflow_id,
                    workflow_name: name.to_string(),
                    status: ExecutionStatus::Completed,
                    template,
                    agents_involved: results.len(),
                    summary,
                    results,
                    execution_time_ms,
                })
            }
            Err(message) => {
                let mut record = guard.record.clone();
                record.status = ExecutionStatus::Failed;
                record.error = Some(message.clone());
                record.duration_ms = guard.clock.elapsed().as_millis() as u64;
                guard.commit(record).await;

                self.hub
                    .publish(HubEvent::WorkflowFailed {
                        workflow_id: workflow_id.clone(),
                        workflow_name: name.to_string(),
                        error: message.clone(),
                        completed_steps: results.len(),
                        timestamp: Utc::now(),
                    })
                    .await;
                tracing::warn!("[Workflow] {} failed: {}", workflow_id, message);

                Err(ServerError::WorkflowFailed {
                    workflow_id,
                    message,
                    partial_results: results,
                })
            }
        }
    }

    /// Run the steps, appending each result to `results` as it completes.
    async fn run_steps(
        &self,
        workflow_id: &str,
        name: &str,
        template: &WorkflowTemplate,
        request: &WorkflowRequest,
        token: &CancellationToken,
        results: &mut Vec<StepResult>,
    ) -> Result<(), String> {
        let total = template.agents.len();

        for (index, agent_name) in template.agents.iter().enumerate() {
            if token.is_cancelled() {
                return Err(CANCELLED_MESSAGE.to_string());
            }

            let Some(agent) = self.registry.get(agent_name).await else {
                tracing::debug!("[Workflow] {} skips unregistered agent {}", workflow_id, agent_name);
                continue;
            };

            let ctx = TaskContext {
                workflow_id: Some(workflow_id.to_string()),
                step: Some(index + 1),
                total_steps: Some(total),
                user_id: request.user_id.clone(),
                parameters: request.parameters.clone(),
                previous_results: results.clone(),
                ..TaskContext::default()
            };
            let task = format!("{}:{}", name, template.step_label(index));

            let result = agent.process(&task, &ctx).await.map_err(|e| {
                format!("Agent {} failed at step {}: {}", agent_name, index + 1, e)
            })?;
            results.push(result.clone());

            self.hub
                .publish(HubEvent::WorkflowProgress {
                    workflow_id: workflow_id.to_string(),
                    workflow_name: name.to_string(),
                    agent: agent_name.clone(),
                    step: index + 1,
                    total_steps: total,
                    status: "completed".to_string(),
                    result,
                    timestamp: Utc::now(),
                })
                .await;

            if index + 1 < total && !self.inter_step_delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return Err(CANCELLED_MESSAGE.to_string()),
                    _ = tokio::time::sleep(self.inter_step_delay) => {}
                }
            }
        }

        Ok(())
    }

    /// Request cancellation of a running execution. Takes effect at the next
    /// step boundary. Returns `false` if no such execution is running.
    pub async fn cancel(&self, workflow_id: &str) -> bool {
        match lock_running(&self.running).get(workflow_id) {
            Some(entry) => {
                tracing::info!("[Workflow] Cancelling {}", workflow_id);
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn cancel_all(&self) {
        for entry in lock_running(&self.running).values() {
            entry.token.cancel();
        }
    }

    pub async fn running(&self) -> Vec<RunningWorkflow> {
        let mut running: Vec<RunningWorkflow> = lock_running(&self.running)
            .values()
            .map(|e| e.info.clone())
            .collect();
        running.sort_by_key(|r| r.started_at);
        running
    }

    pub async fn running_count(&self) -> usize {
        lock_running(&self.running).len()
    }
}

/// `{name}_{unix millis}-{8 hex chars}`; unique even for same-millisecond starts.
fn new_workflow_id(name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}-{}", name, Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::FailingProcessor;
    use crate::agent::{builtin_roster, Agent};
    use crate::models::AgentRole;
    use crate::workflow::summary::MAX_SUMMARY_CHARS;

    struct Fixture {
        engine: Arc<WorkflowEngine>,
        registry: Arc<AgentRegistry>,
        hub: Arc<SubscriberHub>,
        history: Arc<RwLock<ExecutionHistory>>,
    }

    async fn fixture(catalog: WorkflowCatalog, delay: Duration) -> Fixture {
        let registry = Arc::new(AgentRegistry::new());
        for agent in builtin_roster() {
            registry.register(agent).await;
        }
        let hub = Arc::new(SubscriberHub::new());
        let history = Arc::new(RwLock::new(ExecutionHistory::new(100)));
        let engine = WorkflowEngine::new(
            Arc::new(catalog),
            registry.clone(),
            hub.clone(),
            history.clone(),
        )
        .with_inter_step_delay(delay);
        Fixture {
            engine: Arc::new(engine),
            registry,
            hub,
            history,
        }
    }

    fn welcome() -> HubEvent {
        HubEvent::Echo {
            message: "welcome".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fraud_detection_runs_two_steps() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::ZERO).await;
        let result = f
            .engine
            .execute("fraud_detection", WorkflowRequest::default())
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].agent, "fraud_agent");
        assert_eq!(result.results[1].agent, "customer_agent");
        assert!(result.summary.chars().count() <= MAX_SUMMARY_CHARS);
        assert!(result.workflow_id.starts_with("fraud_detection_"));

        let history = f.history.read().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.recent(1)[0].status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_workflow_leaves_history_untouched() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::ZERO).await;
        let err = f
            .engine
            .execute("not_a_workflow", WorkflowRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
        assert!(f.history.read().await.is_empty());
        assert_eq!(f.history.read().await.stats().total_executions, 0);
    }

    #[tokio::test]
    async fn test_zero_agents_completes_with_no_results() {
        let mut catalog = WorkflowCatalog::empty();
        catalog.insert(WorkflowTemplate::new("noop", "Noop", "", &[], &[]));
        let f = fixture(catalog, Duration::ZERO).await;

        let result = f.engine.execute("noop", WorkflowRequest::default()).await.unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.execution_time_ms, 0);
        assert_eq!(f.history.read().await.stats().successful_executions, 1);
    }

    #[tokio::test]
    async fn test_progress_events_follow_step_order_and_skip_missing_agents() {
        let mut catalog = WorkflowCatalog::empty();
        catalog.insert(WorkflowTemplate::new(
            "mixed",
            "Mixed",
            "",
            &["inventory_agent", "ghost_agent", "pricing_agent"],
            &[],
        ));
        let f = fixture(catalog, Duration::ZERO).await;
        let mut rx = f.hub.subscribe("watcher", welcome()).await;
        let _ = rx.recv().await;

        let result = f.engine.execute("mixed", WorkflowRequest::default()).await.unwrap();
        assert_eq!(result.results.len(), 2);

        let mut progress = Vec::new();
        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                HubEvent::WorkflowProgress { agent, step, total_steps, .. } => {
                    assert_eq!(total_steps, 3);
                    progress.push((agent, step));
                }
                HubEvent::WorkflowCompleted { total_agents, .. } => {
                    assert_eq!(total_agents, 2);
                    completed = true;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(
            progress,
            vec![("inventory_agent".to_string(), 1), ("pricing_agent".to_string(), 3)]
        );
        assert!(completed);
    }

    #[tokio::test]
    async fn test_failing_agent_records_partial_results() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::ZERO).await;
        f.registry
            .register(
                Agent::new("customer_agent", AgentRole::Customer, &[])
                    .with_processor(Box::new(FailingProcessor(AgentRole::Customer))),
            )
            .await;

        let err = f
            .engine
            .execute("fraud_detection", WorkflowRequest::default())
            .await
            .unwrap_err();
        match err {
            ServerError::WorkflowFailed { partial_results, .. } => {
                assert_eq!(partial_results.len(), 1);
                assert_eq!(partial_results[0].agent, "fraud_agent");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let history = f.history.read().await;
        let record = &history.recent(1)[0];
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.results.len(), 1);
        assert!(record.error.as_deref().unwrap_or("").contains("customer_agent"));
    }

    #[tokio::test]
    async fn test_success_rate_after_mixed_runs() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::ZERO).await;
        assert_eq!(f.history.read().await.stats().success_rate, 0.0);

        for _ in 0..3 {
            f.engine
                .execute("inventory_optimization", WorkflowRequest::default())
                .await
                .unwrap();
        }
        f.registry
            .register(
                Agent::new("fraud_agent", AgentRole::Fraud, &[])
                    .with_processor(Box::new(FailingProcessor(AgentRole::Fraud))),
            )
            .await;
        assert!(f
            .engine
            .execute("fraud_detection", WorkflowRequest::default())
            .await
            .is_err());

        assert_eq!(f.history.read().await.stats().success_rate, 0.75);
    }

    #[tokio::test]
    async fn test_cancel_between_steps() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::from_secs(5)).await;
        let engine = f.engine.clone();
        let handle = tokio::spawn(async move {
            engine
                .execute("customer_optimization", WorkflowRequest::default())
                .await
        });

        let id = loop {
            if let Some(running) = f.engine.running().await.first() {
                break running.id.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(f.engine.cancel(&id).await);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ServerError::WorkflowFailed { .. }));
        assert_eq!(f.engine.running_count().await, 0);
        assert!(!f.engine.cancel(&id).await);

        let history = f.history.read().await;
        assert_eq!(history.stats().failed_executions, 1);
        assert_eq!(history.recent(1)[0].error.as_deref(), Some("Execution cancelled"));
    }

    #[tokio::test]
    async fn test_dropped_execution_is_recorded_and_released() {
        let f = fixture(WorkflowCatalog::builtin(), Duration::from_millis(200)).await;
        let engine = f.engine.clone();
        let handle = tokio::spawn(async move {
            engine
                .execute("fraud_detection", WorkflowRequest::default())
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.engine.running_count().await, 1);
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(f.engine.running_count().await, 0);
        let history = f.history.read().await;
        assert_eq!(history.len(), 1);
        let record = &history.recent(1)[0];
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Execution aborted"));
        assert_eq!(record.results.len(), 1);
        assert_eq!(record.results[0].agent, "fraud_agent");
    }
}
