//! Agent registry — name → agent, plus the endpoint table used to build the
//! resolver chain.
//!
//! Lookups snapshot the agent handle before awaiting, so a slow agent never
//! holds the registry lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::agent::{Agent, AgentError};
use crate::models::{AgentInfo, MessageBody, StepResult};
use crate::resolver::{Endpoint, Protocol};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Agent not found: {0}")]
    NotFound(String),
    #[error("Agent {0} does not accept agent-to-agent messages")]
    Unsupported(String),
    #[error("Agent {agent} failed: {source}")]
    Failed {
        agent: String,
        #[source]
        source: AgentError,
    },
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<Agent>>>,
    endpoints: RwLock<BTreeMap<String, Endpoint>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any previous agent with the same name.
    pub async fn register(&self, agent: Agent) -> Arc<Agent> {
        let agent = Arc::new(agent);
        let previous = self
            .agents
            .write()
            .await
            .insert(agent.name().to_string(), agent.clone());
        if previous.is_some() {
            tracing::info!("[Registry] Replaced agent {}", agent.name());
        } else {
            tracing::info!("[Registry] Registered agent {} ({})", agent.name(), agent.role());
        }
        agent
    }

    pub async fn register_endpoint(&self, name: &str, address: &str, protocol: Protocol) {
        self.endpoints.write().await.insert(
            name.to_string(),
            Endpoint {
                name: name.to_string(),
                address: address.to_string(),
                protocol,
            },
        );
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.agents.read().await.contains_key(name)
    }

    /// Registered agent names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Roster snapshot with per-agent metrics, sorted by name.
    pub async fn list(&self) -> Vec<AgentInfo> {
        let agents: Vec<Arc<Agent>> = self.agents.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(agents.len());
        for agent in agents {
            infos.push(agent.info().await);
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    pub async fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.read().await.values().cloned().collect()
    }

    /// Deliver a message to one agent and wait for its result.
    pub async fn deliver(
        &self,
        from: &str,
        to: &str,
        body: &MessageBody,
    ) -> Result<StepResult, DeliveryError> {
        let agent = self
            .get(to)
            .await
            .ok_or_else(|| DeliveryError::NotFound(to.to_string()))?;
        deliver_to(&agent, from, body).await
    }

    /// Deliver a message to every A2A-capable agent except the sender.
    /// One recipient failing does not affect the others.
    pub async fn broadcast(
        &self,
        from: &str,
        body: &MessageBody,
    ) -> BTreeMap<String, Result<StepResult, DeliveryError>> {
        let recipients: Vec<Arc<Agent>> = self
            .agents
            .read()
            .await
            .values()
            .filter(|a| a.name() != from && a.accepts_messages())
            .cloned()
            .collect();

        let mut outcomes = BTreeMap::new();
        for agent in recipients {
            let outcome = deliver_to(&agent, from, body).await;
            if let Err(e) = &outcome {
                tracing::warn!("[Registry] Broadcast to {} failed: {}", agent.name(), e);
            }
            outcomes.insert(agent.name().to_string(), outcome);
        }
        outcomes
    }

    /// Drop every agent and endpoint. Safe to call more than once.
    pub async fn shutdown(&self) {
        let removed = {
            let mut agents = self.agents.write().await;
            let n = agents.len();
            agents.clear();
            n
        };
        self.endpoints.write().await.clear();
        if removed > 0 {
            tracing::info!("[Registry] Shut down {} agents", removed);
        }
    }
}

async fn deliver_to(
    agent: &Agent,
    from: &str,
    body: &MessageBody,
) -> Result<StepResult, DeliveryError> {
    if !agent.accepts_messages() {
        return Err(DeliveryError::Unsupported(agent.name().to_string()));
    }
    agent
        .handle_message(from, body)
        .await
        .map_err(|source| DeliveryError::Failed {
            agent: agent.name().to_string(),
            source,
        })
}
