//! Tiered resilient resolver.
//!
//! Agents fetch authoritative catalog data through a [`ResolverChain`]. The
//! chain tries its backends strictly in priority order and returns the first
//! well-formed answer:
//!
//! ```text
//! resolve(capability)
//!   ├─► direct   (JSON-RPC over TCP to the catalog service)   ── fail/timeout ─┐
//!   ├─► gateway  (HTTP POST {base}/{capability})              ◄────────────────┘
//!   │                                                           ── fail/timeout ─┐
//!   └─► static   (built-in dataset, never fails, never blocks) ◄────────────────┘
//! ```
//!
//! Every network attempt is bounded by the chain's tier timeout. The tier
//! that answered is reported with the data so callers can surface how fresh
//! (and how trustworthy) it is.

pub mod direct;
pub mod fallback;
pub mod gateway;

pub use direct::DirectBackend;
pub use fallback::StaticCatalog;
pub use gateway::GatewayBackend;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::{Cart, Product};

// ─── Capabilities & tiers ──────────────────────────────────────────────────

/// A data operation a backend can answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ListProducts,
    GetProduct,
    GetCart,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::GetCart => "get_cart",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "list_products" => Some(Self::ListProducts),
            "get_product" => Some(Self::GetProduct),
            "get_cart" => Some(Self::GetCart),
            _ => None,
        }
    }

    /// Method name on the direct JSON-RPC channel.
    pub fn rpc_method(&self) -> &'static str {
        match self {
            Self::ListProducts => "ListProducts",
            Self::GetProduct => "GetProduct",
            Self::GetCart => "GetCart",
        }
    }
}

/// Where a resolved answer came from, in priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Direct,
    Gateway,
    Static,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Gateway => "gateway",
            Self::Static => "static",
        }
    }

    /// Confidence multiplier agents apply to data from this tier.
    pub fn trust(&self) -> f64 {
        match self {
            Self::Direct => 0.92,
            Self::Gateway => 0.88,
            Self::Static => 0.7,
        }
    }
}

// ─── Endpoints ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Direct,
    Gateway,
}

/// A named external service address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    pub address: String,
    pub protocol: Protocol,
}

/// Endpoint plus the health flag left by the most recent attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    pub name: String,
    pub address: String,
    pub tier: SourceTier,
    /// `None` until the backend has been tried at least once.
    pub healthy: Option<bool>,
}

// ─── Backends ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One network tier of the chain.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;
    fn tier(&self) -> SourceTier;
    fn address(&self) -> &str;

    /// Fetch the raw JSON answer for `capability`.
    async fn fetch(&self, capability: Capability, params: &Value) -> Result<Value, TierError>;

    /// Cheap liveness probe, used only by [`ResolverChain::health_check`].
    async fn probe(&self) -> Result<Value, TierError>;
}

// ─── Resolution ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ResolvedData {
    Products(Vec<Product>),
    Product(Option<Product>),
    Cart(Cart),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub data: ResolvedData,
    pub source: SourceTier,
    /// Name of the backend that answered.
    pub backend: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealth {
    pub tier: SourceTier,
    pub address: String,
    /// `healthy` or `unreachable`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered fallback across direct, gateway and static sources.
pub struct ResolverChain {
    backends: Vec<Arc<dyn Backend>>,
    fallback: StaticCatalog,
    tier_timeout: Duration,
    health: RwLock<HashMap<String, bool>>,
}

impl ResolverChain {
    /// A chain with only the static tier.
    pub fn new(tier_timeout: Duration) -> Self {
        Self {
            backends: Vec::new(),
            fallback: StaticCatalog::new(),
            tier_timeout,
            health: RwLock::new(HashMap::new()),
        }
    }

    /// Add a network backend. Backends are kept ordered by tier; within a
    /// tier, registration order wins.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.push(backend);
        self.backends.sort_by_key(|b| b.tier());
        self
    }

    /// Build a chain from an endpoint table.
    pub fn from_endpoints(endpoints: &[Endpoint], tier_timeout: Duration) -> Self {
        endpoints
            .iter()
            .fold(Self::new(tier_timeout), |chain, ep| match ep.protocol {
                Protocol::Direct => {
                    chain.with_backend(Arc::new(DirectBackend::new(&ep.name, &ep.address)))
                }
                Protocol::Gateway => chain.with_backend(Arc::new(GatewayBackend::new(
                    &ep.name,
                    &ep.address,
                    tier_timeout,
                ))),
            })
    }

    pub fn tier_timeout(&self) -> Duration {
        self.tier_timeout
    }

    /// Resolve `capability`, falling through tiers until one succeeds.
    /// Never fails: the static tier always answers.
    pub async fn resolve(&self, capability: Capability, params: &Value) -> Resolution {
        for backend in &self.backends {
            let attempt = tokio::time::timeout(self.tier_timeout, backend.fetch(capability, params))
                .await
                .unwrap_or(Err(TierError::Timeout(self.tier_timeout)))
                .and_then(|raw| decode(capability, raw));

            match attempt {
                Ok(data) => {
                    self.mark(backend.name(), true).await;
                    tracing::debug!(
                        "[Resolver] {} answered by {} ({})",
                        capability.as_str(),
                        backend.name(),
                        backend.tier().as_str()
                    );
                    return Resolution {
                        data,
                        source: backend.tier(),
                        backend: backend.name().to_string(),
                    };
                }
                Err(e) => {
                    self.mark(backend.name(), false).await;
                    tracing::warn!(
                        "[Resolver] {} via {} failed, falling through: {}",
                        capability.as_str(),
                        backend.name(),
                        e
                    );
                }
            }
        }

        Resolution {
            data: self.fallback.resolve(capability, params),
            source: SourceTier::Static,
            backend: StaticCatalog::NAME.to_string(),
        }
    }

    pub async fn products(&self) -> (Vec<Product>, SourceTier) {
        let resolution = self.resolve(Capability::ListProducts, &Value::Null).await;
        match resolution.data {
            ResolvedData::Products(products) => (products, resolution.source),
            _ => (self.fallback.products(), SourceTier::Static),
        }
    }

    pub async fn cart(&self, user_id: &str) -> (Cart, SourceTier) {
        let params = serde_json::json!({ "user_id": user_id });
        let resolution = self.resolve(Capability::GetCart, &params).await;
        match resolution.data {
            ResolvedData::Cart(cart) => (cart, resolution.source),
            _ => (Cart::empty(user_id), SourceTier::Static),
        }
    }

    /// Probe every backend independently. Advisory only; `resolve` does not
    /// consult the result.
    pub async fn health_check(&self) -> BTreeMap<String, BackendHealth> {
        let mut report = BTreeMap::new();
        for backend in &self.backends {
            let probe = tokio::time::timeout(self.tier_timeout, backend.probe())
                .await
                .unwrap_or(Err(TierError::Timeout(self.tier_timeout)));
            let entry = match probe {
                Ok(details) => BackendHealth {
                    tier: backend.tier(),
                    address: backend.address().to_string(),
                    status: "healthy".to_string(),
                    details: Some(details),
                    error: None,
                },
                Err(e) => BackendHealth {
                    tier: backend.tier(),
                    address: backend.address().to_string(),
                    status: "unreachable".to_string(),
                    details: None,
                    error: Some(e.to_string()),
                },
            };
            report.insert(backend.name().to_string(), entry);
        }
        report.insert(
            StaticCatalog::NAME.to_string(),
            BackendHealth {
                tier: SourceTier::Static,
                address: "builtin".to_string(),
                status: "healthy".to_string(),
                details: None,
                error: None,
            },
        );
        report
    }

    /// Current endpoint table with last-known health flags.
    pub async fn endpoints(&self) -> Vec<EndpointStatus> {
        let health = self.health.read().await;
        self.backends
            .iter()
            .map(|b| EndpointStatus {
                name: b.name().to_string(),
                address: b.address().to_string(),
                tier: b.tier(),
                healthy: health.get(b.name()).copied(),
            })
            .chain(std::iter::once(EndpointStatus {
                name: StaticCatalog::NAME.to_string(),
                address: "builtin".to_string(),
                tier: SourceTier::Static,
                healthy: Some(true),
            }))
            .collect()
    }

    async fn mark(&self, backend: &str, healthy: bool) {
        self.health.write().await.insert(backend.to_string(), healthy);
    }
}

/// Validate a raw backend answer. Empty or ill-shaped answers count as a
/// tier failure so the chain moves on.
fn decode(capability: Capability, raw: Value) -> Result<ResolvedData, TierError> {
    match capability {
        Capability::ListProducts => {
            let products = raw
                .get("products")
                .cloned()
                .ok_or_else(|| TierError::Malformed("missing 'products'".to_string()))?;
            let products: Vec<Product> = serde_json::from_value(products)
                .map_err(|e| TierError::Malformed(e.to_string()))?;
            if products.is_empty() {
                return Err(TierError::Malformed("empty product list".to_string()));
            }
            Ok(ResolvedData::Products(products))
        }
        Capability::GetProduct => match raw.get("product") {
            Some(p) if !p.is_null() => serde_json::from_value(p.clone())
                .map(|p| ResolvedData::Product(Some(p)))
                .map_err(|e| TierError::Malformed(e.to_string())),
            _ => Err(TierError::Malformed("product not found".to_string())),
        },
        Capability::GetCart => {
            let cart = raw
                .get("cart")
                .cloned()
                .ok_or_else(|| TierError::Malformed("missing 'cart'".to_string()))?;
            serde_json::from_value(cart)
                .map(ResolvedData::Cart)
                .map_err(|e| TierError::Malformed(e.to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend for exercising the chain without a network.
    pub(crate) struct ScriptedBackend {
        pub name: String,
        pub tier: SourceTier,
        pub answer: Option<Value>,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn ok(name: &str, tier: SourceTier, answer: Value) -> Self {
            Self {
                name: name.to_string(),
                tier,
                answer: Some(answer),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(name: &str, tier: SourceTier) -> Self {
            Self {
                name: name.to_string(),
                tier,
                answer: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        fn name(&self) -> &str {
            &self.name
        }
        fn tier(&self) -> SourceTier {
            self.tier
        }
        fn address(&self) -> &str {
            "scripted"
        }
        async fn fetch(&self, _: Capability, _: &Value) -> Result<Value, TierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer
                .clone()
                .ok_or_else(|| TierError::Transport("connection refused".to_string()))
        }
        async fn probe(&self) -> Result<Value, TierError> {
            self.answer
                .as_ref()
                .map(|_| serde_json::json!({ "status": "ok" }))
                .ok_or_else(|| TierError::Transport("connection refused".to_string()))
        }
    }

    fn one_product() -> Value {
        serde_json::json!({ "products": [{
            "id": "2ZYFJ3GM2N",
            "name": "Hairdryer",
            "price_usd": { "currency_code": "USD", "units": 24, "nanos": 990000000 }
        }]})
    }

    #[tokio::test]
    async fn test_direct_tier_wins_when_healthy() {
        let direct = Arc::new(ScriptedBackend::ok("direct", SourceTier::Direct, one_product()));
        let gateway = Arc::new(ScriptedBackend::ok("gw", SourceTier::Gateway, one_product()));
        let chain = ResolverChain::new(Duration::from_secs(1))
            .with_backend(gateway.clone())
            .with_backend(direct.clone());

        let res = chain.resolve(Capability::ListProducts, &Value::Null).await;
        assert_eq!(res.source, SourceTier::Direct);
        assert_eq!(res.backend, "direct");
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_through_to_gateway() {
        let direct = Arc::new(ScriptedBackend::failing("direct", SourceTier::Direct));
        let gateway = Arc::new(ScriptedBackend::ok("gw", SourceTier::Gateway, one_product()));
        let chain = ResolverChain::new(Duration::from_secs(1))
            .with_backend(direct)
            .with_backend(gateway);

        let res = chain.resolve(Capability::ListProducts, &Value::Null).await;
        assert_eq!(res.source, SourceTier::Gateway);
        match res.data {
            ResolvedData::Products(p) => assert_eq!(p[0].name, "Hairdryer"),
            other => panic!("unexpected data: {:?}", other),
        }

        let endpoints = chain.endpoints().await;
        assert_eq!(endpoints[0].healthy, Some(false));
        assert_eq!(endpoints[1].healthy, Some(true));
    }

    #[tokio::test]
    async fn test_both_network_tiers_down_yields_static() {
        let chain = ResolverChain::new(Duration::from_secs(1))
            .with_backend(Arc::new(ScriptedBackend::failing("direct", SourceTier::Direct)))
            .with_backend(Arc::new(ScriptedBackend::failing("gw", SourceTier::Gateway)));

        let res = chain.resolve(Capability::ListProducts, &Value::Null).await;
        assert_eq!(res.source, SourceTier::Static);
        match res.data {
            ResolvedData::Products(p) => assert!(!p.is_empty()),
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_tier_times_out() {
        let mut slow = ScriptedBackend::ok("direct", SourceTier::Direct, one_product());
        slow.delay = Duration::from_millis(500);
        let chain = ResolverChain::new(Duration::from_millis(20)).with_backend(Arc::new(slow));

        let res = chain.resolve(Capability::ListProducts, &Value::Null).await;
        assert_eq!(res.source, SourceTier::Static);
    }

    #[tokio::test]
    async fn test_empty_answer_is_tier_failure() {
        let empty = serde_json::json!({ "products": [] });
        let chain = ResolverChain::new(Duration::from_secs(1))
            .with_backend(Arc::new(ScriptedBackend::ok("gw", SourceTier::Gateway, empty)));

        let res = chain.resolve(Capability::ListProducts, &Value::Null).await;
        assert_eq!(res.source, SourceTier::Static);
    }

    #[tokio::test]
    async fn test_health_check_reports_each_backend() {
        let chain = ResolverChain::new(Duration::from_secs(1))
            .with_backend(Arc::new(ScriptedBackend::failing("direct", SourceTier::Direct)))
            .with_backend(Arc::new(ScriptedBackend::ok("gw", SourceTier::Gateway, one_product())));

        let health = chain.health_check().await;
        assert_eq!(health["direct"].status, "unreachable");
        assert_eq!(health["gw"].status, "healthy");
        assert_eq!(health[StaticCatalog::NAME].status, "healthy");
    }

    #[test]
    fn test_capability_names_round_trip() {
        for cap in [Capability::ListProducts, Capability::GetProduct, Capability::GetCart] {
            assert_eq!(Capability::from_str(cap.as_str()), Some(cap));
        }
        assert_eq!(Capability::from_str("delete_everything"), None);
    }
}
