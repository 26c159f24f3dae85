//! Subscriber hub — pushes orchestration events to live subscribers.
//!
//! Each subscriber owns a bounded channel. Publishing never blocks: a
//! subscriber whose channel is full or closed is evicted after the pass,
//! and the remaining subscribers still receive the event.

pub mod channel;
pub mod simulation;

pub use channel::{ChannelCommand, ChannelReply};
pub use simulation::{SimulatedEventKind, SimulationReport};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, RwLock};

use crate::models::StepResult;

/// Default per-subscriber buffer.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

/// Events delivered to subscribers, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HubEvent {
    ConnectionEstablished {
        message: String,
        client_id: String,
        available_workflows: Vec<String>,
        active_agents: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    WorkflowStarted {
        workflow_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    WorkflowProgress {
        workflow_id: String,
        workflow_name: String,
        agent: String,
        step: usize,
        total_steps: usize,
        status: String,
        result: StepResult,
        timestamp: DateTime<Utc>,
    },
    WorkflowCompleted {
        workflow_id: String,
        workflow_name: String,
        summary: String,
        total_agents: usize,
        timestamp: DateTime<Utc>,
    },
    WorkflowFailed {
        workflow_id: String,
        workflow_name: String,
        error: String,
        completed_steps: usize,
        timestamp: DateTime<Utc>,
    },
    AgentCommunication {
        from_agent: String,
        to_agent: String,
        message_type: String,
        correlation_id: String,
        response: Value,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        active_workflows: usize,
        timestamp: DateTime<Utc>,
    },
    SimulatedEvent {
        event_type: SimulatedEventKind,
        details: Map<String, Value>,
        simulation: bool,
        timestamp: DateTime<Utc>,
    },
    Echo {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl HubEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::WorkflowStarted { .. } => "workflow_started",
            Self::WorkflowProgress { .. } => "workflow_progress",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFailed { .. } => "workflow_failed",
            Self::AgentCommunication { .. } => "agent_communication",
            Self::Heartbeat { .. } => "heartbeat",
            Self::SimulatedEvent { .. } => "simulated_event",
            Self::Echo { .. } => "echo",
        }
    }
}

/// One live subscription, returned by [`SubscriberHub::subscribe`].
///
/// The key distinguishes this subscription from a later one that reuses the
/// same client id, so a stale connection can never unsubscribe its successor.
#[derive(Debug)]
pub struct Subscription {
    client_id: String,
    key: u64,
    events: mpsc::Receiver<HubEvent>,
}

impl Subscription {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Next event, or `None` once the hub has dropped this subscription.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Result<HubEvent, TryRecvError> {
        self.events.try_recv()
    }
}

struct Slot {
    key: u64,
    tx: mpsc::Sender<HubEvent>,
}

pub struct SubscriberHub {
    subscribers: RwLock<HashMap<String, Slot>>,
    next_key: AtomicU64,
    capacity: usize,
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_key: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber and queue `welcome` as its first event.
    /// Re-using a client id replaces the earlier subscription.
    pub async fn subscribe(&self, client_id: &str, welcome: HubEvent) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        // Fresh channel with capacity >= 1; cannot be full.
        let _ = tx.try_send(welcome);
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .subscribers
            .write()
            .await
            .insert(client_id.to_string(), Slot { key, tx })
            .is_some();
        tracing::info!(
            "[Hub] Subscriber {} connected{}",
            client_id,
            if replaced { " (replaced)" } else { "" }
        );
        Subscription {
            client_id: client_id.to_string(),
            key,
            events: rx,
        }
    }

    /// Deliver `event` to every subscriber. Returns how many received it.
    pub async fn publish(&self, event: HubEvent) -> usize {
        let targets: Vec<(String, mpsc::Sender<HubEvent>)> = {
            let subscribers = self.subscribers.read().await;
            if subscribers.is_empty() {
                return 0;
            }
            subscribers
                .iter()
                .map(|(id, slot)| (id.clone(), slot.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!("[Hub] Dropping subscriber {}: {}", id, e);
                    dead.push((id, tx));
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for (id, tx) in dead {
                // Only evict the channel that failed, not a newer one under the same id.
                if subscribers.get(&id).is_some_and(|cur| cur.tx.same_channel(&tx)) {
                    subscribers.remove(&id);
                }
            }
        }
        delivered
    }

    /// Remove `subscription` from the hub. A newer subscription under the
    /// same client id is left in place.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let current = subscribers
            .get(&subscription.client_id)
            .is_some_and(|slot| slot.key == subscription.key);
        if current {
            subscribers.remove(&subscription.client_id);
            tracing::info!("[Hub] Subscriber {} disconnected", subscription.client_id);
        }
        current
    }

    pub async fn count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Drop every subscription; receivers observe end-of-stream.
    pub async fn close_all(&self) {
        self.subscribers.write().await.clear();
    }
}
