//! Command implementations behind the `agentmesh` binary.

pub mod commands;
