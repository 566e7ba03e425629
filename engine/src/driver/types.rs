//! Driver Types
//!
//! Shared types flowing between the planner, the governor, and the state
//! machine loop: plan steps and the per-step execution records folded into
//! the request context.

use crate::governor::AgentRole;
use sdk::agent::AgentResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool family a plan step dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Inventory,
    Ocr,
    Recipe,
    Greeting,
    Help,
    Analytics,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Ocr => "ocr",
            Self::Recipe => "recipe",
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation a plan step requests from its tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOperation {
    Read,
    Create,
    Update,
    Delete,
    BulkAdd,
    Scan,
    Suggest,
    Report,
    Greet,
    Guide,
}

impl StepOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BulkAdd => "bulk_add",
            Self::Scan => "scan",
            Self::Suggest => "suggest",
            Self::Report => "report",
            Self::Greet => "greet",
            Self::Guide => "guide",
        }
    }

    /// Whether this operation mutates backend state
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete | Self::BulkAdd)
    }
}

impl fmt::Display for StepOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work in the ordered plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Position in the plan, starting at 0
    pub index: usize,

    /// Tool family to dispatch to
    pub tool: ToolKind,

    /// Operation requested from the tool
    pub operation: StepOperation,

    /// Human-readable description of the step
    pub description: String,
}

impl PlanStep {
    pub fn new(
        index: usize,
        tool: ToolKind,
        operation: StepOperation,
        description: impl Into<String>,
    ) -> Self {
        Self {
            index,
            tool,
            operation,
            description: description.into(),
        }
    }
}

/// Result of one executed plan step, as folded into the context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Role that produced this result
    pub role: AgentRole,

    /// Operation the step requested, when it came from a plan step
    pub operation: Option<StepOperation>,

    /// The agent's result
    pub result: AgentResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_serialization() {
        assert_eq!(serde_json::to_string(&ToolKind::Inventory).unwrap(), "\"inventory\"");
        assert_eq!(serde_json::to_string(&ToolKind::Ocr).unwrap(), "\"ocr\"");
        let parsed: ToolKind = serde_json::from_str("\"recipe\"").unwrap();
        assert_eq!(parsed, ToolKind::Recipe);
    }

    #[test]
    fn test_step_operation_is_write() {
        assert!(StepOperation::Create.is_write());
        assert!(StepOperation::Update.is_write());
        assert!(StepOperation::Delete.is_write());
        assert!(StepOperation::BulkAdd.is_write());

        assert!(!StepOperation::Read.is_write());
        assert!(!StepOperation::Scan.is_write());
        assert!(!StepOperation::Suggest.is_write());
        assert!(!StepOperation::Report.is_write());
        assert!(!StepOperation::Greet.is_write());
        assert!(!StepOperation::Guide.is_write());
    }

    #[test]
    fn test_step_operation_serialization() {
        assert_eq!(
            serde_json::to_string(&StepOperation::BulkAdd).unwrap(),
            "\"bulk_add\""
        );
        let parsed: StepOperation = serde_json::from_str("\"bulk_add\"").unwrap();
        assert_eq!(parsed, StepOperation::BulkAdd);
    }

    #[test]
    fn test_plan_step_round_trip() {
        let step = PlanStep::new(0, ToolKind::Inventory, StepOperation::Read, "Get inventory");
        let json = serde_json::to_string(&step).unwrap();
        let parsed: PlanStep = serde_json::from_str(&json).unwrap();
        assert_eq!(step, parsed);
    }
}
