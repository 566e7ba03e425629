//! State Machine Driver
//!
//! This module implements the bounded loop that carries one request from
//! intent classification to a reply:
//!
//! 1. Ask the governor which agent may run for the current state
//! 2. Reject early when the governor says preconditions are not met
//! 3. Build the agent-specific input from the context
//! 4. Validate tool preconditions immediately before the call
//! 5. Execute the chosen agent (with a per-call timeout)
//! 6. Fold the result into the context and advance state
//!
//! # Limits
//!
//! - Max 10 state transitions per request
//! - 30-second timeout per agent call
//! - No retries: a failed or timed-out call consumes exactly one transition
//!
//! Failures never escape `process_message`; they resolve into the error state
//! and a templated reply.

use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::governor::{AgentRole, ExecutionState, Governor};

use super::context::ExecutionContext;
use super::types::{ExecutionRecord, PlanStep};

/// Maximum number of state transitions per request
const MAX_TRANSITIONS: usize = 10;

/// Timeout for each agent call in seconds
const AGENT_TIMEOUT_SECS: u64 = 30;

/// The seven capability agents the driver dispatches to
pub struct AgentSet {
    pub intent: Arc<dyn CapabilityAgent>,
    pub planner: Arc<dyn CapabilityAgent>,
    pub inventory: Arc<dyn CapabilityAgent>,
    pub ocr: Arc<dyn CapabilityAgent>,
    pub recipe: Arc<dyn CapabilityAgent>,
    pub validator: Arc<dyn CapabilityAgent>,
    pub responder: Arc<dyn CapabilityAgent>,
}

impl AgentSet {
    /// Resolve a role to its agent
    pub fn get(&self, role: AgentRole) -> &Arc<dyn CapabilityAgent> {
        match role {
            AgentRole::Intent => &self.intent,
            AgentRole::Planner => &self.planner,
            AgentRole::Inventory => &self.inventory,
            AgentRole::Ocr => &self.ocr,
            AgentRole::Recipe => &self.recipe,
            AgentRole::Validator => &self.validator,
            AgentRole::Responder => &self.responder,
        }
    }
}

/// Governor-driven state machine over the capability agents
pub struct StateMachine {
    governor: Governor,
    agents: AgentSet,
}

impl StateMachine {
    /// Create a new state machine
    pub fn new(governor: Governor, agents: AgentSet) -> Self {
        Self { governor, agents }
    }

    /// Access the governor
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Access the agent set
    pub fn agents(&self) -> &AgentSet {
        &self.agents
    }

    /// Process one user message through the full governed loop
    ///
    /// Always returns a reply string; every failure class is resolved into
    /// the error state and a templated message.
    pub async fn process_message(
        &self,
        message: &str,
        kitchen_id: i64,
        user_email: &str,
    ) -> String {
        let request_id = Uuid::new_v4();
        let mut context = ExecutionContext::new(message, kitchen_id, user_email);

        debug!("Request {} processing: {}", request_id, message);

        let mut iteration = 0;
        while context.current_state != ExecutionState::Respond
            && context.current_state != ExecutionState::Error
            && iteration < MAX_TRANSITIONS
        {
            iteration += 1;

            let decision = self
                .governor
                .decide_next_agent(context.current_state, &context.snapshot());

            debug!(
                "Request {} iteration {}/{}: state {} -> agent {} ({})",
                request_id,
                iteration,
                MAX_TRANSITIONS,
                context.current_state,
                decision.allowed_agent,
                decision.reasoning
            );

            // Governor rejected the request outright
            if !decision.preconditions_met {
                context.record_error(
                    decision
                        .reject_reason
                        .unwrap_or_else(|| "Action rejected".to_string()),
                );
                context.current_state = ExecutionState::Error;
                continue;
            }

            let input = self.build_agent_input(decision.allowed_agent, &context);

            // Tool preconditions are checked immediately before the call
            if !self
                .governor
                .validate_tool_preconditions(decision.allowed_agent, &input)
            {
                context.record_error(format!(
                    "Preconditions not met for {}",
                    decision.allowed_agent
                ));
                context.current_state = ExecutionState::Error;
                continue;
            }

            let result = self.invoke_agent(decision.allowed_agent, input).await;
            debug!(
                "Request {} agent {} success={}",
                request_id, decision.allowed_agent, result.success
            );

            if Self::fold_result(&mut context, decision.allowed_agent, result) {
                context.current_state = decision.next_state;
            } else {
                // A failed agent resolves the request into the error state
                context.current_state = ExecutionState::Error;
            }
        }

        // Cap fired while still mid-flight
        if iteration >= MAX_TRANSITIONS
            && context.current_state != ExecutionState::Respond
            && context.current_state != ExecutionState::Error
        {
            warn!(
                "Request {} exceeded max transitions ({})",
                request_id, MAX_TRANSITIONS
            );
            context.record_error("Max state transitions exceeded");
            context.current_state = ExecutionState::Error;
        }

        if context.current_state == ExecutionState::Error {
            self.error_reply(&context).await
        } else {
            self.final_reply(&context).await
        }
    }

    /// Build the agent-specific input from the context
    fn build_agent_input(&self, role: AgentRole, context: &ExecutionContext) -> AgentInput {
        match role {
            AgentRole::Intent => AgentInput::new("classify")
                .with_param("message", json!(context.user_message)),

            AgentRole::Planner => AgentInput::new("plan")
                .with_param("intent", json!(context.intent))
                .with_param("message", json!(context.user_message))
                .with_param("kitchen_id", json!(context.kitchen_id)),

            AgentRole::Inventory | AgentRole::Ocr | AgentRole::Recipe => {
                match context.current_plan_step() {
                    Some(step) => AgentInput::new(step.operation.as_str())
                        .with_param("kitchen_id", json!(context.kitchen_id))
                        .with_param("user_email", json!(context.user_email))
                        .with_param("message", json!(context.user_message))
                        .with_param("description", json!(step.description))
                        .with_param("step_index", json!(step.index)),
                    None => AgentInput::new("read")
                        .with_param("kitchen_id", json!(context.kitchen_id)),
                }
            }

            AgentRole::Validator => {
                let last = context.execution_results.last();
                let validation_type = match last {
                    Some(record) if record.result.data.get("extracted_items").is_some() => {
                        "ocr_result"
                    }
                    _ => "inventory_write",
                };

                // The validator sees the step output plus its confidence
                let mut data = last
                    .map(|record| record.result.data.clone())
                    .unwrap_or_else(|| json!({}));
                if let (Some(record), Some(object)) = (last, data.as_object_mut()) {
                    object.insert("confidence".to_string(), json!(record.result.confidence));
                }

                AgentInput::new("validate")
                    .with_param("validation_type", json!(validation_type))
                    .with_param("data", data)
            }

            AgentRole::Responder => {
                let execution_state = if context.errors.is_empty() {
                    "success"
                } else {
                    "error"
                };
                AgentInput::new("respond")
                    .with_param("execution_state", json!(execution_state))
                    .with_param(
                        "context",
                        json!({
                            "intent": context.intent,
                            "execution_results": Self::results_json(context),
                            "error_reason": context.last_error(),
                            "plan_steps": context.plan_steps,
                        }),
                    )
            }
        }
    }

    /// Execute an agent with the per-call timeout; a timeout is folded into a
    /// failed result like any other fault
    async fn invoke_agent(&self, role: AgentRole, input: AgentInput) -> AgentResult {
        let agent = self.agents.get(role);
        match timeout(
            Duration::from_secs(AGENT_TIMEOUT_SECS),
            agent.execute(input),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("Agent {} timed out after {}s", role, AGENT_TIMEOUT_SECS);
                AgentResult::fail(format!("{role} agent timed out"))
            }
        }
    }

    /// Fold an agent result into the context. Returns false when the agent
    /// reported failure.
    fn fold_result(context: &mut ExecutionContext, role: AgentRole, result: AgentResult) -> bool {
        context.record_metadata(role, &result);

        if !result.success {
            context.record_error(
                result
                    .error_message
                    .unwrap_or_else(|| "Agent execution failed".to_string()),
            );
            return false;
        }

        match role {
            AgentRole::Intent => {
                context.intent = result.data_str("intent").map(str::to_string);
                context.intent_confidence = result.data_f64("confidence").unwrap_or(0.0);
            }

            AgentRole::Planner => {
                let steps = result
                    .data
                    .get("plan_steps")
                    .cloned()
                    .map(serde_json::from_value::<Vec<PlanStep>>)
                    .and_then(|parsed| parsed.ok());
                context.plan_steps = match steps {
                    Some(steps) => steps,
                    None => {
                        warn!("Planner produced unparseable plan steps");
                        Vec::new()
                    }
                };
                context.current_step = 0;
            }

            AgentRole::Inventory | AgentRole::Ocr | AgentRole::Recipe => {
                let operation = context.current_plan_step().map(|step| step.operation);
                context.execution_results.push(ExecutionRecord {
                    role,
                    operation,
                    result,
                });
                if context.current_step < context.plan_steps.len() {
                    context.current_step += 1;
                }
            }

            AgentRole::Validator => {
                let invalid = result.data_bool("is_valid") == Some(false);
                if invalid {
                    if let Some(errors) = result.data.get("errors").and_then(|e| e.as_array()) {
                        for error in errors {
                            if let Some(text) = error.as_str() {
                                context.record_error(text);
                            }
                        }
                    }
                }
                context.validation_results.push(result);
            }

            AgentRole::Responder => {}
        }

        true
    }

    /// Execution results in the shape the responder formats
    fn results_json(context: &ExecutionContext) -> serde_json::Value {
        let results: Vec<serde_json::Value> = context
            .execution_results
            .iter()
            .map(|record| {
                json!({
                    "operation": record.operation,
                    "data": record.result.data,
                    "confidence": record.result.confidence,
                })
            })
            .collect();
        json!(results)
    }

    /// Final reply for a request that reached the respond state
    async fn final_reply(&self, context: &ExecutionContext) -> String {
        let input = AgentInput::new("respond")
            .with_param("execution_state", json!("success"))
            .with_param(
                "context",
                json!({
                    "intent": context.intent,
                    "execution_results": Self::results_json(context),
                    "plan_steps": context.plan_steps,
                }),
            );
        let result = self.invoke_agent(AgentRole::Responder, input).await;
        result
            .data_str("response")
            .map(str::to_string)
            .unwrap_or_else(|| "Task completed successfully!".to_string())
    }

    /// Final reply for a request that resolved into the error state
    async fn error_reply(&self, context: &ExecutionContext) -> String {
        let reason = context.last_error().unwrap_or("Unknown error");
        let input = AgentInput::new("respond")
            .with_param("execution_state", json!("error"))
            .with_param("context", json!({ "error_reason": reason }));
        let result = self.invoke_agent(AgentRole::Responder, input).await;
        result
            .data_str("response")
            .map(str::to_string)
            .unwrap_or_else(|| "Sorry, something went wrong.".to_string())
    }
}
