//! Larder SDK
//!
//! Shared library providing the capability-agent contract and error types for
//! Larder components. This crate is used by the engine and by any out-of-tree
//! agent implementation.

/// Capability agent trait and result types
pub mod agent;

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use agent::{AgentInput, AgentParamError, AgentResult, CapabilityAgent};
pub use errors::{AssistantErrorExt, EngineError};
