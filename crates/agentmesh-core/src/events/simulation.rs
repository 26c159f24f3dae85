//! Synthetic business events, broadcast on request so dashboards and clients
//! can be exercised without a live storefront.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::HubEvent;

/// Answer to a simulation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Always `event_simulated`.
    pub status: String,
    pub event: HubEvent,
    /// Subscribers that received the event.
    pub broadcasted_to: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedEventKind {
    PriceDrop,
    LowStock,
    FraudAlert,
    CustomerSegmentUpdate,
}

impl SimulatedEventKind {
    pub const ALL: [Self; 4] = [
        Self::PriceDrop,
        Self::LowStock,
        Self::FraudAlert,
        Self::CustomerSegmentUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceDrop => "price_drop",
            Self::LowStock => "low_stock",
            Self::FraudAlert => "fraud_alert",
            Self::CustomerSegmentUpdate => "customer_segment_update",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s.trim())
    }

    /// Event payload. `product` and `user_id` in `params` override the
    /// default subject; every other field is fixed.
    pub fn details(&self, params: &Map<String, Value>, now: DateTime<Utc>) -> Map<String, Value> {
        let param = |key: &str, default: &str| {
            params
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        let details = match self {
            Self::PriceDrop => json!({
                "productName": param("product", "Vintage Camera"),
                "oldPrice": 149.99,
                "newPrice": 119.99,
                "discount": 20,
            }),
            Self::LowStock => json!({
                "productName": param("product", "Hipster Beanie"),
                "quantity": 3,
                "reorderThreshold": 5,
            }),
            Self::FraudAlert => json!({
                "transactionId": format!("txn_{}", now.timestamp_millis()),
                "riskScore": 0.87,
                "riskFactors": ["unusual_location", "high_velocity"],
            }),
            Self::CustomerSegmentUpdate => json!({
                "userId": param("user_id", "user_12345"),
                "oldSegment": "regular",
                "newSegment": "premium",
                "trigger": "purchase_threshold_reached",
            }),
        };

        match details {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl std::fmt::Display for SimulatedEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_known_kinds_only() {
        for kind in SimulatedEventKind::ALL {
            assert_eq!(SimulatedEventKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(SimulatedEventKind::from_str("meteor_strike"), None);
    }

    #[test]
    fn test_details_use_parameter_overrides() {
        let mut params = Map::new();
        params.insert("product".to_string(), json!("Film Camera"));

        let now = Utc::now();
        let price = SimulatedEventKind::PriceDrop.details(&params, now);
        assert_eq!(price["productName"], "Film Camera");
        assert_eq!(price["discount"], 20);

        let stock = SimulatedEventKind::LowStock.details(&Map::new(), now);
        assert_eq!(stock["productName"], "Hipster Beanie");

        let fraud = SimulatedEventKind::FraudAlert.details(&params, now);
        assert_eq!(fraud["transactionId"], format!("txn_{}", now.timestamp_millis()));
    }
}
