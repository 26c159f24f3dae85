//! Gateway tier — the same capabilities exposed over HTTP.
//!
//! `POST {base}/{capability}` with the params as JSON body;
//! `GET {base}/health` for probes.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Backend, Capability, SourceTier, TierError};

pub struct GatewayBackend {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl GatewayBackend {
    pub fn new(name: &str, base_url: &str, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, TierError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TierError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| TierError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl Backend for GatewayBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Gateway
    }

    fn address(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, capability: Capability, params: &Value) -> Result<Value, TierError> {
        let url = format!("{}/{}", self.base_url, capability.as_str());
        let mut request = self.client.post(&url);
        if !params.is_null() {
            request = request.json(params);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn probe(&self) -> Result<Value, TierError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gw = GatewayBackend::new("gw", "http://catalog:8080/", Duration::from_secs(1));
        assert_eq!(gw.address(), "http://catalog:8080");
        assert_eq!(gw.tier(), SourceTier::Gateway);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let gw = GatewayBackend::new("gw", "http://127.0.0.1:9", Duration::from_millis(500));
        let err = gw
            .fetch(Capability::ListProducts, &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::Transport(_)));
    }
}
