//! Agent-to-agent relay: delivers messages through the registry and reports
//! each exchange to subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::error::ServerError;
use crate::events::{HubEvent, SubscriberHub};
use crate::models::{
    AgentMessage, AgentMessageResponse, BroadcastMessage, BroadcastReport, DeliveryReport,
};
use crate::registry::{AgentRegistry, DeliveryError};

pub struct A2aRelay {
    registry: Arc<AgentRegistry>,
    hub: Arc<SubscriberHub>,
}

impl A2aRelay {
    pub fn new(registry: Arc<AgentRegistry>, hub: Arc<SubscriberHub>) -> Self {
        Self { registry, hub }
    }

    /// Deliver one message. Both endpoints must be registered agents.
    pub async fn send(&self, message: AgentMessage) -> Result<AgentMessageResponse, ServerError> {
        if !self.registry.contains(&message.from_agent).await {
            return Err(ServerError::NotFound(format!(
                "Agent not found: {}",
                message.from_agent
            )));
        }

        let response = self
            .registry
            .deliver(&message.from_agent, &message.to_agent, &message.body)
            .await
            .map_err(|e| match e {
                DeliveryError::NotFound(name) => {
                    ServerError::NotFound(format!("Agent not found: {}", name))
                }
                DeliveryError::Unsupported(_) => ServerError::BadRequest(e.to_string()),
                DeliveryError::Failed { .. } => ServerError::Internal(e.to_string()),
            })?;

        self.hub
            .publish(HubEvent::AgentCommunication {
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                message_type: message.body.message_type.clone(),
                correlation_id: message.body.correlation_id.clone(),
                response: serde_json::to_value(&response).unwrap_or_default(),
                timestamp: Utc::now(),
            })
            .await;
        tracing::info!(
            "[A2A] {} -> {} ({}, {})",
            message.from_agent,
            message.to_agent,
            message.body.message_type,
            message.body.correlation_id
        );

        Ok(AgentMessageResponse {
            status: "message_delivered".to_string(),
            correlation_id: message.body.correlation_id,
            response,
        })
    }

    /// Fan a message out to every other A2A-capable agent.
    pub async fn broadcast(&self, message: BroadcastMessage) -> Result<BroadcastReport, ServerError> {
        if !self.registry.contains(&message.from_agent).await {
            return Err(ServerError::NotFound(format!(
                "Agent not found: {}",
                message.from_agent
            )));
        }

        let outcomes = self
            .registry
            .broadcast(&message.from_agent, &message.body)
            .await;

        let mut results = BTreeMap::new();
        for (agent, outcome) in outcomes {
            let report = match outcome {
                Ok(result) => {
                    self.hub
                        .publish(HubEvent::AgentCommunication {
                            from_agent: message.from_agent.clone(),
                            to_agent: agent.clone(),
                            message_type: message.body.message_type.clone(),
                            correlation_id: message.body.correlation_id.clone(),
                            response: serde_json::to_value(&result).unwrap_or_default(),
                            timestamp: Utc::now(),
                        })
                        .await;
                    DeliveryReport::Delivered(result)
                }
                Err(e) => DeliveryReport::Failed {
                    error: e.to_string(),
                },
            };
            results.insert(agent, report);
        }

        Ok(BroadcastReport {
            from_agent: message.from_agent,
            correlation_id: message.body.correlation_id,
            results,
        })
    }
}
