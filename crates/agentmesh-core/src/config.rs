//! Runtime configuration for the orchestrator.
//!
//! Every knob has a default suitable for local runs and can be overridden
//! from the environment via [`OrchestratorConfig::from_env`]. The CLI layers
//! its own flags on top.

use std::time::Duration;

/// Default number of execution records retained in memory.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Top-level orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum history records kept; `0` keeps everything.
    pub history_capacity: usize,
    /// Simulated processing latency for each agent invocation.
    pub step_delay: Duration,
    /// Pause between consecutive workflow steps.
    pub inter_step_delay: Duration,
    /// Idle interval after which subscribers receive a heartbeat.
    pub heartbeat_interval: Duration,
    pub resolver: ResolverConfig,
    /// Text-generation collaborator used for workflow summaries.
    pub summary: Option<SummaryConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            step_delay: Duration::from_millis(100),
            inter_step_delay: Duration::from_millis(200),
            heartbeat_interval: Duration::from_secs(30),
            resolver: ResolverConfig::default(),
            summary: None,
        }
    }
}

impl OrchestratorConfig {
    /// Build a configuration from `AGENTMESH_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            history_capacity: env_parse("AGENTMESH_HISTORY_CAPACITY")
                .unwrap_or(defaults.history_capacity),
            step_delay: env_parse("AGENTMESH_STEP_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.step_delay),
            inter_step_delay: env_parse("AGENTMESH_INTER_STEP_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inter_step_delay),
            heartbeat_interval: env_parse("AGENTMESH_HEARTBEAT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            resolver: ResolverConfig::from_env(),
            summary: SummaryConfig::from_env(),
        }
    }

    /// Drop all simulated latency. Used by tests and one-shot CLI runs.
    pub fn without_delays(mut self) -> Self {
        self.step_delay = Duration::ZERO;
        self.inter_step_delay = Duration::ZERO;
        self
    }
}

/// Backends consulted by the resolver chain, in addition to the static tier.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// `host:port` of the direct JSON-RPC channel to the catalog service.
    pub direct_addr: Option<String>,
    /// Base URL of the HTTP gateway exposing the same capabilities.
    pub gateway_url: Option<String>,
    /// Upper bound for a single tier attempt.
    pub tier_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            direct_addr: None,
            gateway_url: None,
            tier_timeout: Duration::from_secs(5),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        Self {
            direct_addr: env_non_empty("AGENTMESH_DIRECT_ADDR"),
            gateway_url: env_non_empty("AGENTMESH_GATEWAY_URL"),
            tier_timeout: env_parse("AGENTMESH_TIER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(5)),
        }
    }
}

/// Messages-API compatible endpoint used to phrase workflow summaries.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl SummaryConfig {
    /// Returns `None` when no API key is present; summaries then use the
    /// deterministic fallback sentences.
    pub fn from_env() -> Option<Self> {
        let api_key = env_non_empty("ANTHROPIC_AUTH_TOKEN")
            .or_else(|| env_non_empty("ANTHROPIC_API_KEY"))?;
        Some(Self {
            base_url: env_non_empty("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            api_key,
            model: env_non_empty("AGENTMESH_SUMMARY_MODEL")
                .unwrap_or_else(|| "claude-3-5-haiku-latest".to_string()),
            timeout: Duration::from_secs(10),
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|v| v.trim().parse().ok())
}
