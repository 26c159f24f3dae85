use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of agent roles. Anything unrecognised is `Generic`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Pricing,
    Inventory,
    Customer,
    Fraud,
    Personalization,
    Generic,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::Inventory => "inventory",
            Self::Customer => "customer",
            Self::Fraud => "fraud",
            Self::Personalization => "personalization",
            Self::Generic => "generic",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pricing" => Self::Pricing,
            "inventory" => Self::Inventory,
            "customer" => Self::Customer,
            "fraud" => Self::Fraud,
            "personalization" => Self::Personalization,
            _ => Self::Generic,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed usage statistics of an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub messages_processed: u64,
    pub successes: u64,
    pub failures: u64,
    /// Exponentially weighted success rate; `None` until the first call finishes.
    pub success_rate: Option<f64>,
    /// Exponentially weighted response time in milliseconds.
    pub avg_response_time_ms: Option<f64>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Roster entry exposed by the status surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub name: String,
    pub role: AgentRole,
    pub capabilities: Vec<String>,
    pub accepts_messages: bool,
    pub status: String,
    #[serde(flatten)]
    pub metrics: AgentMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_is_generic() {
        assert_eq!(AgentRole::from_str("FRAUD"), AgentRole::Fraud);
        assert_eq!(AgentRole::from_str("shipping"), AgentRole::Generic);
        assert_eq!(AgentRole::from_str(""), AgentRole::Generic);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&AgentRole::Personalization).unwrap();
        assert_eq!(json, "\"personalization\"");
    }
}
