//! Driver System
//!
//! The bounded state-machine loop that carries a request from intent
//! classification to a reply, and the cost-aware front door that short-circuits
//! it whenever a zero-call gate or a single classification suffices.

pub mod context;
pub mod machine;
pub mod optimized;
pub mod types;

pub use context::ExecutionContext;
pub use machine::{AgentSet, StateMachine};
pub use optimized::{OptimizedStateMachine, StatsSnapshot};
pub use types::{ExecutionRecord, PlanStep, StepOperation, ToolKind};
