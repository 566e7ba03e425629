//! Governor
//!
//! Single source of truth for state transitions and per-agent admission
//! control. `decide_next_agent` is a pure function over an immutable snapshot
//! of the request context: identical (state, snapshot) inputs always yield an
//! identical decision. The rule table is configuration, not code.
//!
//! The governor also validates tool preconditions immediately before any
//! agent call: negative quantities and missing item ids for inventory
//! updates, missing image payloads for OCR, and any write operation against
//! the strictly read-only recipe agent are rejected here.

use sdk::agent::{AgentInput, AgentResult};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::driver::types::{ExecutionRecord, PlanStep, ToolKind};

/// Execution states of the request loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Intent,
    Plan,
    Execute,
    Validate,
    Respond,
    Error,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Validate => "validate",
            Self::Respond => "respond",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability agent roles the governor can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Intent,
    Planner,
    Inventory,
    Ocr,
    Recipe,
    Validator,
    Responder,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Planner => "planner",
            Self::Inventory => "inventory",
            Self::Ocr => "ocr",
            Self::Recipe => "recipe",
            Self::Validator => "validator",
            Self::Responder => "responder",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing decision produced by the governor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    /// Agent permitted to run next
    pub allowed_agent: AgentRole,

    /// State the loop moves to after that agent runs
    pub next_state: ExecutionState,

    /// Governor's confidence in this routing
    pub confidence: f64,

    /// Why this route was chosen
    pub reasoning: String,

    /// False when the request is rejected instead of routed
    pub preconditions_met: bool,

    /// Rejection reason when `preconditions_met` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

/// Governor rule table
///
/// Exposed as configuration: every threshold and flag can be overridden from
/// the `[governor]` section without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorRules {
    /// OCR results below this confidence are routed through validation
    #[serde(default = "default_ocr_confidence_threshold")]
    pub ocr_confidence_threshold: f64,

    /// Inventory writes must pass validation before responding
    #[serde(default = "default_true")]
    pub inventory_write_requires_validation: bool,

    /// The recipe agent may never perform writes
    #[serde(default = "default_true")]
    pub recipe_agent_readonly: bool,

    /// Plans longer than this are rejected outright
    #[serde(default = "default_max_plan_steps")]
    pub max_plan_steps: usize,

    /// Minimum intent confidence required to proceed past classification
    #[serde(default = "default_require_intent_confidence")]
    pub require_intent_confidence: f64,
}

impl Default for GovernorRules {
    fn default() -> Self {
        Self {
            ocr_confidence_threshold: default_ocr_confidence_threshold(),
            inventory_write_requires_validation: true,
            recipe_agent_readonly: true,
            max_plan_steps: default_max_plan_steps(),
            require_intent_confidence: default_require_intent_confidence(),
        }
    }
}

fn default_ocr_confidence_threshold() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_max_plan_steps() -> usize {
    5
}

fn default_require_intent_confidence() -> f64 {
    0.7
}

/// Immutable view of the request context used for routing decisions
#[derive(Debug, Clone, Copy)]
pub struct ContextSnapshot<'a> {
    /// Classified intent, if the intent agent has run
    pub intent: Option<&'a str>,

    /// Confidence of the classified intent
    pub intent_confidence: f64,

    /// Current plan
    pub plan_steps: &'a [PlanStep],

    /// Most recent execution record, if any step has run
    pub last_execution: Option<&'a ExecutionRecord>,

    /// Most recent validation result, if the validator has run
    pub last_validation: Option<&'a AgentResult>,
}

/// The governor
pub struct Governor {
    rules: GovernorRules,
}

impl Governor {
    /// Create a governor with the given rule table
    pub fn new(rules: GovernorRules) -> Self {
        Self { rules }
    }

    /// Access the active rule table
    pub fn rules(&self) -> &GovernorRules {
        &self.rules
    }

    /// Decide which agent may run next for the given state
    pub fn decide_next_agent(
        &self,
        current_state: ExecutionState,
        context: &ContextSnapshot<'_>,
    ) -> AgentDecision {
        match current_state {
            ExecutionState::Intent => self.route_from_intent(context),
            ExecutionState::Plan => self.route_from_plan(context),
            ExecutionState::Execute => self.route_from_execute(context),
            ExecutionState::Validate => self.route_from_validate(context),
            ExecutionState::Respond | ExecutionState::Error => AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Respond,
                confidence: 1.0,
                reasoning: "Default to response".to_string(),
                preconditions_met: true,
                reject_reason: None,
            },
        }
    }

    fn route_from_intent(&self, context: &ContextSnapshot<'_>) -> AgentDecision {
        // Nothing classified yet: the intent agent runs before the
        // confidence rule can apply.
        if context.intent.is_none() {
            return AgentDecision {
                allowed_agent: AgentRole::Intent,
                next_state: ExecutionState::Intent,
                confidence: 1.0,
                reasoning: "Classify intent first".to_string(),
                preconditions_met: true,
                reject_reason: None,
            };
        }

        if context.intent_confidence < self.rules.require_intent_confidence {
            return AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Respond,
                confidence: 1.0,
                reasoning: "Intent unclear, need clarification".to_string(),
                preconditions_met: false,
                reject_reason: Some("Low intent confidence".to_string()),
            };
        }

        AgentDecision {
            allowed_agent: AgentRole::Planner,
            next_state: ExecutionState::Plan,
            confidence: 0.9,
            reasoning: "Intent clear, proceed to planning".to_string(),
            preconditions_met: true,
            reject_reason: None,
        }
    }

    fn route_from_plan(&self, context: &ContextSnapshot<'_>) -> AgentDecision {
        if context.plan_steps.len() > self.rules.max_plan_steps {
            return AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Respond,
                confidence: 1.0,
                reasoning: "Plan too complex".to_string(),
                preconditions_met: false,
                reject_reason: Some("Exceeds max plan steps".to_string()),
            };
        }

        let Some(first_step) = context.plan_steps.first() else {
            return AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Execute,
                confidence: 0.85,
                reasoning: "No executable step planned".to_string(),
                preconditions_met: true,
                reject_reason: None,
            };
        };

        // Greeting and help need no tool execution at all
        if matches!(first_step.tool, ToolKind::Greeting | ToolKind::Help) {
            return AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Respond,
                confidence: 1.0,
                reasoning: format!("Direct response for {}", first_step.tool),
                preconditions_met: true,
                reject_reason: None,
            };
        }

        let agent = match first_step.tool {
            ToolKind::Inventory => AgentRole::Inventory,
            ToolKind::Ocr => AgentRole::Ocr,
            ToolKind::Recipe => AgentRole::Recipe,
            ToolKind::Greeting | ToolKind::Help | ToolKind::Analytics => AgentRole::Responder,
        };

        AgentDecision {
            allowed_agent: agent,
            next_state: ExecutionState::Execute,
            confidence: 0.85,
            reasoning: format!("Execute {} step", first_step.tool),
            preconditions_met: true,
            reject_reason: None,
        }
    }

    fn route_from_execute(&self, context: &ContextSnapshot<'_>) -> AgentDecision {
        if let Some(record) = context.last_execution {
            // Low-confidence OCR output must be validated before responding
            if record.role == AgentRole::Ocr
                && record.result.confidence < self.rules.ocr_confidence_threshold
            {
                return AgentDecision {
                    allowed_agent: AgentRole::Validator,
                    next_state: ExecutionState::Validate,
                    confidence: 1.0,
                    reasoning: "OCR confidence too low, needs validation".to_string(),
                    preconditions_met: true,
                    reject_reason: None,
                };
            }

            // Inventory writes go through validation when the rule is on
            let is_write = record.operation.map(|op| op.is_write()).unwrap_or(false);
            if record.role == AgentRole::Inventory
                && is_write
                && self.rules.inventory_write_requires_validation
            {
                return AgentDecision {
                    allowed_agent: AgentRole::Validator,
                    next_state: ExecutionState::Validate,
                    confidence: 1.0,
                    reasoning: "Inventory write requires validation".to_string(),
                    preconditions_met: true,
                    reject_reason: None,
                };
            }
        }

        AgentDecision {
            allowed_agent: AgentRole::Responder,
            next_state: ExecutionState::Respond,
            confidence: 0.9,
            reasoning: "Execution successful, ready to respond".to_string(),
            preconditions_met: true,
            reject_reason: None,
        }
    }

    fn route_from_validate(&self, context: &ContextSnapshot<'_>) -> AgentDecision {
        let is_valid = context
            .last_validation
            .and_then(|result| result.data_bool("is_valid"))
            .unwrap_or(false);

        if !is_valid {
            let reject_reason = context
                .last_validation
                .and_then(|result| result.data.get("errors"))
                .and_then(|errors| errors.as_array())
                .and_then(|errors| errors.first())
                .and_then(|error| error.as_str())
                .unwrap_or("Validation failed")
                .to_string();

            return AgentDecision {
                allowed_agent: AgentRole::Responder,
                next_state: ExecutionState::Error,
                confidence: 1.0,
                reasoning: "Validation failed".to_string(),
                preconditions_met: false,
                reject_reason: Some(reject_reason),
            };
        }

        AgentDecision {
            allowed_agent: AgentRole::Responder,
            next_state: ExecutionState::Respond,
            confidence: 1.0,
            reasoning: "Validation passed, ready to respond".to_string(),
            preconditions_met: true,
            reject_reason: None,
        }
    }

    /// Validate tool preconditions before an agent is permitted to run
    pub fn validate_tool_preconditions(&self, agent: AgentRole, tool_input: &AgentInput) -> bool {
        match agent {
            AgentRole::Inventory => self.validate_inventory_preconditions(tool_input),
            AgentRole::Ocr => self.validate_ocr_preconditions(tool_input),
            AgentRole::Recipe => self.validate_recipe_preconditions(tool_input),
            AgentRole::Intent
            | AgentRole::Planner
            | AgentRole::Validator
            | AgentRole::Responder => true,
        }
    }

    fn validate_inventory_preconditions(&self, tool_input: &AgentInput) -> bool {
        if tool_input.operation == "update" {
            let quantity = tool_input.param_f64_opt("quantity").unwrap_or(0.0);
            if quantity < 0.0 {
                return false;
            }
            match tool_input.param_str_opt("canonical_item_id") {
                Some(id) if !id.trim().is_empty() => {}
                _ => return false,
            }
        }
        true
    }

    fn validate_ocr_preconditions(&self, tool_input: &AgentInput) -> bool {
        match tool_input.param_str_opt("image_data") {
            Some(image_data) => !image_data.is_empty(),
            None => false,
        }
    }

    fn validate_recipe_preconditions(&self, tool_input: &AgentInput) -> bool {
        if self.rules.recipe_agent_readonly
            && matches!(tool_input.operation.as_str(), "create" | "update" | "delete")
        {
            return false;
        }
        true
    }
}
