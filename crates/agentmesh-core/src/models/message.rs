use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::StepResult;

/// The part of an agent-to-agent message that travels to the recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub message_type: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Echoed back unchanged so callers can pair requests and responses.
    pub correlation_id: String,
}

/// A directed message between two registered agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub from_agent: String,
    pub to_agent: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// A message fanned out from one agent to every other A2A-capable agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub from_agent: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageResponse {
    pub status: String,
    pub correlation_id: String,
    pub response: StepResult,
}

/// Per-recipient outcome of a broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeliveryReport {
    Delivered(StepResult),
    Failed { error: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReport {
    pub from_agent: String,
    pub correlation_id: String,
    pub results: std::collections::BTreeMap<String, DeliveryReport>,
}
