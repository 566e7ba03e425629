//! Execution Context
//!
//! Per-request mutable record threading state through the loop. One context
//! is created per `process_message` call, owned exclusively by the driver for
//! its lifetime, and discarded afterwards; conversation state is ephemeral.

use sdk::agent::AgentResult;
use serde_json::{Map, Value};

use crate::governor::{AgentRole, ContextSnapshot, ExecutionState};

use super::types::{ExecutionRecord, PlanStep};

/// Per-request execution context
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The raw user utterance
    pub user_message: String,

    /// Kitchen the request operates on
    pub kitchen_id: i64,

    /// Requesting user
    pub user_email: String,

    /// Current loop state
    pub current_state: ExecutionState,

    /// Classified intent, once known
    pub intent: Option<String>,

    /// Confidence of the classified intent
    pub intent_confidence: f64,

    /// Ordered plan produced by the planner
    pub plan_steps: Vec<PlanStep>,

    /// Index of the next plan step to execute (0 ≤ current_step ≤ plan length)
    pub current_step: usize,

    /// Results of executed plan steps, append-only
    pub execution_results: Vec<ExecutionRecord>,

    /// Validator results, append-only
    pub validation_results: Vec<AgentResult>,

    /// Accumulated errors, append-only; non-empty leads to the error state
    pub errors: Vec<String>,

    /// One entry per agent invoked during the request
    pub metadata: Map<String, Value>,
}

impl ExecutionContext {
    /// Create a fresh context in the intent state
    pub fn new(user_message: &str, kitchen_id: i64, user_email: &str) -> Self {
        Self {
            user_message: user_message.to_string(),
            kitchen_id,
            user_email: user_email.to_string(),
            current_state: ExecutionState::Intent,
            intent: None,
            intent_confidence: 0.0,
            plan_steps: Vec::new(),
            current_step: 0,
            execution_results: Vec::new(),
            validation_results: Vec::new(),
            errors: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Immutable view for governor decisions
    pub fn snapshot(&self) -> ContextSnapshot<'_> {
        ContextSnapshot {
            intent: self.intent.as_deref(),
            intent_confidence: self.intent_confidence,
            plan_steps: &self.plan_steps,
            last_execution: self.execution_results.last(),
            last_validation: self.validation_results.last(),
        }
    }

    /// Append an error
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Most recent error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }

    /// The plan step the loop is currently positioned on
    pub fn current_plan_step(&self) -> Option<&PlanStep> {
        self.plan_steps.get(self.current_step)
    }

    /// Record an agent invocation result in the metadata map
    pub fn record_metadata(&mut self, role: AgentRole, result: &AgentResult) {
        if let Ok(value) = serde_json::to_value(result) {
            self.metadata.insert(format!("{role}_result"), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::types::{StepOperation, ToolKind};
    use serde_json::json;

    #[test]
    fn test_fresh_context() {
        let context = ExecutionContext::new("hello", 1, "a@example.com");
        assert_eq!(context.current_state, ExecutionState::Intent);
        assert_eq!(context.intent, None);
        assert_eq!(context.intent_confidence, 0.0);
        assert_eq!(context.current_step, 0);
        assert!(context.plan_steps.is_empty());
        assert!(context.errors.is_empty());
    }

    #[test]
    fn test_snapshot_reflects_latest_entries() {
        let mut context = ExecutionContext::new("show inventory", 1, "a@example.com");
        context.intent_confidence = 0.9;
        context.plan_steps = vec![PlanStep::new(
            0,
            ToolKind::Inventory,
            StepOperation::Read,
            "Get inventory",
        )];
        context.execution_results.push(ExecutionRecord {
            role: AgentRole::Inventory,
            operation: Some(StepOperation::Read),
            result: AgentResult::ok(json!({"inventory": []}), 1.0),
        });

        let snapshot = context.snapshot();
        assert_eq!(snapshot.intent_confidence, 0.9);
        assert_eq!(snapshot.plan_steps.len(), 1);
        assert_eq!(
            snapshot.last_execution.map(|r| r.role),
            Some(AgentRole::Inventory)
        );
        assert!(snapshot.last_validation.is_none());
    }

    #[test]
    fn test_errors_append_only() {
        let mut context = ExecutionContext::new("x", 1, "a@example.com");
        context.record_error("first");
        context.record_error("second");
        assert_eq!(context.errors, vec!["first", "second"]);
        assert_eq!(context.last_error(), Some("second"));
    }

    #[test]
    fn test_record_metadata() {
        let mut context = ExecutionContext::new("x", 1, "a@example.com");
        context.record_metadata(AgentRole::Intent, &AgentResult::ok(json!({}), 0.9));
        assert!(context.metadata.contains_key("intent_result"));
    }
}
