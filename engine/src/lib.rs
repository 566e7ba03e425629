//! Larder Engine Library
//!
//! This library provides the core functionality of the Larder kitchen
//! assistant: a governed, cost-aware orchestration loop that routes each user
//! utterance through a set of capability agents while minimizing calls to
//! external generation backends. It is used by both the main binary and
//! integration tests.

/// Configuration management module
pub mod config;

/// Kitchen backend HTTP client
pub mod backend;

/// Chat model provider abstraction layer
pub mod llm;

/// Per-user bounded conversation history
pub mod history;

/// Cost optimizer: zero-call exit gates and intent cache
pub mod optimizer;

/// Governor: state routing policy and tool preconditions
pub mod governor;

/// State machine driver and cost-aware front door
pub mod driver;

/// Capability agent implementations
pub mod agents;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;
