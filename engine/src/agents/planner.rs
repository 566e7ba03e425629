//! Planner Agent
//!
//! Turns a classified intent into an ordered plan of tool steps. Plans are
//! deterministic templates; the only message-sensitive part is verb sniffing
//! for inventory mutations.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::json;

use crate::driver::types::{PlanStep, StepOperation, ToolKind};

#[derive(Default)]
pub struct PlannerAgent;

impl PlannerAgent {
    pub fn new() -> Self {
        Self
    }

    fn plan_for(intent: &str, message: &str) -> Vec<PlanStep> {
        match intent {
            i if i.starts_with("inventory") => Self::inventory_plan(message),
            "recipe" => vec![
                PlanStep::new(
                    0,
                    ToolKind::Inventory,
                    StepOperation::Read,
                    "Get available ingredients",
                ),
                PlanStep::new(
                    1,
                    ToolKind::Recipe,
                    StepOperation::Suggest,
                    "Generate recipe suggestions",
                ),
            ],
            "ocr" | "receipt" => vec![
                PlanStep::new(0, ToolKind::Ocr, StepOperation::Scan, "Process receipt image"),
                PlanStep::new(
                    1,
                    ToolKind::Inventory,
                    StepOperation::BulkAdd,
                    "Add extracted items to inventory",
                ),
            ],
            "analytics" => vec![PlanStep::new(
                0,
                ToolKind::Analytics,
                StepOperation::Report,
                "Generate analytics report",
            )],
            "greeting" => vec![PlanStep::new(
                0,
                ToolKind::Greeting,
                StepOperation::Greet,
                "Greet the user",
            )],
            _ => vec![PlanStep::new(
                0,
                ToolKind::Help,
                StepOperation::Guide,
                "Provide help information",
            )],
        }
    }

    fn inventory_plan(message: &str) -> Vec<PlanStep> {
        let lowered = message.to_lowercase();

        let (operation, description) = if ["add", "create", "new"]
            .iter()
            .any(|word| lowered.contains(word))
        {
            (StepOperation::Create, "Add new inventory item")
        } else if ["update", "change", "modify"]
            .iter()
            .any(|word| lowered.contains(word))
        {
            (StepOperation::Update, "Update inventory item")
        } else if ["delete", "remove"].iter().any(|word| lowered.contains(word)) {
            (StepOperation::Delete, "Delete inventory item")
        } else {
            (StepOperation::Read, "Get inventory information")
        };

        vec![PlanStep::new(0, ToolKind::Inventory, operation, description)]
    }
}

#[async_trait]
impl CapabilityAgent for PlannerAgent {
    fn name(&self) -> &str {
        "planner"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        let intent = input.param_str_opt("intent").unwrap_or_default();
        let message = input.param_str_opt("message").unwrap_or_default();

        let steps = Self::plan_for(&intent, &message);
        let total_steps = steps.len();

        AgentResult::ok(
            json!({
                "plan_steps": steps,
                "total_steps": total_steps,
                "estimated_secs": total_steps * 2,
            }),
            0.9,
        )
        .with_meta("planner_type", json!(intent))
    }
}
