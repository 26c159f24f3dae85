//! Shared orchestrator state, used by every adapter (HTTP, WebSocket, CLI).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::agent::builtin_roster;
use crate::config::OrchestratorConfig;
use crate::error::ServerError;
use crate::events::{
    ChannelCommand, ChannelReply, HubEvent, SimulatedEventKind, SimulationReport, SubscriberHub,
    Subscription,
};
use crate::models::{AgentAggregate, HistoryPage, SystemMetrics, SystemStatus};
use crate::registry::AgentRegistry;
use crate::relay::A2aRelay;
use crate::resolver::{Protocol, ResolverChain};
use crate::workflow::{ExecutionHistory, MessagesApiSummarizer, WorkflowCatalog, WorkflowEngine};

pub const DIRECT_ENDPOINT: &str = "product-catalog-direct";
pub const GATEWAY_ENDPOINT: &str = "product-catalog-gateway";

/// Shared state accessible by all handlers.
pub struct AppStateInner {
    pub config: OrchestratorConfig,
    pub registry: Arc<AgentRegistry>,
    pub resolver: Arc<ResolverChain>,
    pub catalog: Arc<WorkflowCatalog>,
    pub hub: Arc<SubscriberHub>,
    pub history: Arc<RwLock<ExecutionHistory>>,
    pub engine: Arc<WorkflowEngine>,
    pub relay: A2aRelay,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Wire up the endpoint table, resolver chain, built-in agents and
    /// (when configured) the summary collaborator.
    pub async fn bootstrap(config: OrchestratorConfig, catalog: WorkflowCatalog) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        if let Some(addr) = &config.resolver.direct_addr {
            registry
                .register_endpoint(DIRECT_ENDPOINT, addr, Protocol::Direct)
                .await;
        }
        if let Some(url) = &config.resolver.gateway_url {
            registry
                .register_endpoint(GATEWAY_ENDPOINT, url, Protocol::Gateway)
                .await;
        }
        let resolver = Arc::new(ResolverChain::from_endpoints(
            &registry.endpoints().await,
            config.resolver.tier_timeout,
        ));

        for agent in builtin_roster() {
            registry
                .register(
                    agent
                        .with_resolver(resolver.clone())
                        .with_latency(config.step_delay),
                )
                .await;
        }

        tracing::info!(
            "[State] Bootstrapped {} agents, {} workflows, {} resolver endpoints",
            registry.len().await,
            catalog.len(),
            resolver.endpoints().await.len()
        );
        Self::new(config, catalog, registry, resolver)
    }

    /// Assemble state from parts. The registry is used as given.
    pub fn new(
        config: OrchestratorConfig,
        catalog: WorkflowCatalog,
        registry: Arc<AgentRegistry>,
        resolver: Arc<ResolverChain>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let hub = Arc::new(SubscriberHub::new());
        let history = Arc::new(RwLock::new(ExecutionHistory::new(config.history_capacity)));

        let mut engine = WorkflowEngine::new(
            catalog.clone(),
            registry.clone(),
            hub.clone(),
            history.clone(),
        )
        .with_inter_step_delay(config.inter_step_delay);
        if let Some(summary) = &config.summary {
            engine = engine.with_summarizer(Arc::new(MessagesApiSummarizer::new(summary.clone())));
        }

        Self {
            relay: A2aRelay::new(registry.clone(), hub.clone()),
            engine: Arc::new(engine),
            config,
            registry,
            resolver,
            catalog,
            hub,
            history,
        }
    }

    /// Register a subscriber; its first event is `connection_established`.
    pub async fn subscribe(&self, client_id: &str) -> Subscription {
        let welcome = HubEvent::ConnectionEstablished {
            message: "Connected to AgentMesh orchestrator".to_string(),
            client_id: client_id.to_string(),
            available_workflows: self.catalog.names(),
            active_agents: self.registry.names().await,
            timestamp: Utc::now(),
        };
        self.hub.subscribe(client_id, welcome).await
    }

    /// Answer a text command received from a subscriber.
    ///
    /// `execute:<name>` only acknowledges; runs are started through
    /// [`WorkflowEngine::execute`].
    pub async fn handle_channel_input(&self, text: &str) -> ChannelReply {
        match ChannelCommand::parse(text) {
            ChannelCommand::Ping => ChannelReply::Text("pong".to_string()),
            ChannelCommand::Execute(name) if self.catalog.get(&name).is_some() => {
                ChannelReply::Event(HubEvent::WorkflowStarted {
                    message: format!("Starting {}...", name),
                    workflow_name: name,
                    timestamp: Utc::now(),
                })
            }
            ChannelCommand::Execute(_) | ChannelCommand::Other(_) => {
                ChannelReply::Event(HubEvent::Echo {
                    message: format!("Received: {}", text),
                    timestamp: Utc::now(),
                })
            }
        }
    }

    pub async fn heartbeat(&self) -> HubEvent {
        HubEvent::Heartbeat {
            active_workflows: self.engine.running_count().await,
            timestamp: Utc::now(),
        }
    }

    /// Broadcast a synthetic business event to every subscriber.
    /// Unknown event types are rejected with `BadRequest`.
    pub async fn simulate_event(
        &self,
        event_type: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<SimulationReport, ServerError> {
        let kind = SimulatedEventKind::from_str(event_type).ok_or_else(|| {
            ServerError::BadRequest(format!("Unknown event type: {}", event_type))
        })?;
        let now = Utc::now();
        let event = HubEvent::SimulatedEvent {
            event_type: kind,
            details: kind.details(params, now),
            simulation: true,
            timestamp: now,
        };
        let broadcasted_to = self.hub.publish(event.clone()).await;
        tracing::info!("[State] Simulated {} sent to {} subscribers", kind, broadcasted_to);

        Ok(SimulationReport {
            status: "event_simulated".to_string(),
            event,
            broadcasted_to,
        })
    }

    pub async fn history_page(&self, limit: usize) -> HistoryPage {
        self.history.read().await.page(limit)
    }

    pub async fn status(&self) -> SystemStatus {
        let agents = self.registry.list().await;
        SystemStatus {
            system_status: "operational".to_string(),
            active_agents: agents.len(),
            active_connections: self.hub.count().await,
            running_workflows: self.engine.running_count().await,
            total_workflows_executed: self.history.read().await.stats().total_executions,
            agents,
            workflow_templates: self.catalog.all(),
            endpoints: self.resolver.endpoints().await,
            ai_model_available: self.engine.has_summarizer(),
        }
    }

    pub async fn metrics(&self) -> SystemMetrics {
        let agents = self.registry.list().await;
        let observed: Vec<f64> = agents.iter().filter_map(|a| a.metrics.success_rate).collect();
        let most_active = agents
            .iter()
            .filter(|a| a.metrics.messages_processed > 0)
            .max_by_key(|a| a.metrics.messages_processed)
            .map(|a| a.name.clone());

        SystemMetrics {
            workflow_metrics: self.history.read().await.stats(),
            agent_metrics: AgentAggregate {
                total_agents: agents.len(),
                total_messages_processed: agents.iter().map(|a| a.metrics.messages_processed).sum(),
                average_success_rate: if observed.is_empty() {
                    None
                } else {
                    Some(observed.iter().sum::<f64>() / observed.len() as f64)
                },
                most_active_agent: most_active,
            },
            active_subscribers: self.hub.count().await,
            running_workflows: self.engine.running_count().await,
            ai_model_available: self.engine.has_summarizer(),
        }
    }

    /// Cancel running executions, disconnect subscribers, clear the registry.
    pub async fn shutdown(&self) {
        tracing::info!("[State] Shutting down");
        self.engine.cancel_all().await;
        self.hub.close_all().await;
        self.registry.shutdown().await;
    }
}
