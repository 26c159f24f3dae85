//! AgentMesh Core — transport-agnostic orchestration of cooperating agents.
//!
//! This crate contains the agents and their role processors, the agent
//! registry, the tiered resolver chain, the workflow engine with its
//! history, the subscriber hub and the agent-to-agent relay. It has **no
//! HTTP framework dependency** by default, making it suitable for use in:
//!
//! - HTTP/WebSocket servers (via `agentmesh-server`)
//! - CLI tools (via `agentmesh-cli`)
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod registry;
pub mod relay;
pub mod resolver;
pub mod state;
pub mod workflow;

// Convenience re-exports
pub use config::OrchestratorConfig;
pub use error::ServerError;
pub use state::{AppState, AppStateInner};
