//! Capability agent contract
//!
//! This module defines the single-method contract that every capability
//! provider (intent classification, planning, inventory, OCR, recipe,
//! validation, response formatting) must implement, together with the input
//! and result types that cross that boundary.
//!
//! Agents never raise: every internal fault is folded into a failed
//! `AgentResult` so that failure is part of the return contract rather than a
//! side channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input to a capability agent
///
/// Carries the operation being requested plus a free-form parameter map.
/// The typed accessors return an `AgentParamError` when a required parameter
/// is missing or has the wrong shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInput {
    /// Operation requested from the agent (e.g. "read", "classify", "respond")
    pub operation: String,

    /// Named parameters for the operation
    pub params: HashMap<String, serde_json::Value>,
}

impl AgentInput {
    /// Create a new AgentInput for the given operation
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, AgentParamError> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| AgentParamError::MissingParameter(key.to_string()))
    }

    /// Get an i64 parameter
    pub fn param_i64(&self, key: &str) -> Result<i64, AgentParamError> {
        self.params
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AgentParamError::MissingParameter(key.to_string()))
    }

    /// Get an f64 parameter (integers are widened)
    pub fn param_f64(&self, key: &str) -> Result<f64, AgentParamError> {
        self.params
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AgentParamError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Get an optional i64 parameter
    pub fn param_i64_opt(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(|v| v.as_i64())
    }

    /// Get an optional f64 parameter
    pub fn param_f64_opt(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }

    /// Get a parameter as a JSON value
    pub fn param_json(&self, key: &str) -> Result<&serde_json::Value, AgentParamError> {
        self.params
            .get(key)
            .ok_or_else(|| AgentParamError::MissingParameter(key.to_string()))
    }
}

/// Parameter access errors
#[derive(Debug, thiserror::Error)]
pub enum AgentParamError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result returned by every capability agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Whether the agent completed its operation
    pub success: bool,

    /// Operation output as a JSON object
    pub data: serde_json::Value,

    /// Agent's confidence in the output, in [0, 1]
    pub confidence: f64,

    /// Human-readable failure reason when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Tags describing observable side effects (e.g. "inventory_write")
    #[serde(default)]
    pub side_effects: Vec<String>,

    /// Auxiliary agent-specific metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AgentResult {
    /// Create a successful result with data and confidence
    pub fn ok(data: serde_json::Value, confidence: f64) -> Self {
        Self {
            success: true,
            data,
            confidence: confidence.clamp(0.0, 1.0),
            error_message: None,
            side_effects: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a failed result with an error message
    pub fn fail(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            confidence: 0.0,
            error_message: Some(error_message.into()),
            side_effects: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a side-effect tag
    pub fn with_side_effect(mut self, tag: impl Into<String>) -> Self {
        self.side_effects.push(tag.into());
        self
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get a string field from the result data
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get an f64 field from the result data
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    /// Get a bool field from the result data
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }
}

/// Trait that all capability agents must implement
///
/// The orchestration core depends on nothing about a provider beyond this
/// single method. Implementations must be infallible at the type level:
/// network failures, timeouts inside the agent, and malformed collaborator
/// output are all reported through a failed `AgentResult`.
#[async_trait]
pub trait CapabilityAgent: Send + Sync {
    /// Returns the name of the agent (e.g. "intent", "inventory")
    fn name(&self) -> &str;

    /// Execute the agent's primary function
    async fn execute(&self, input: AgentInput) -> AgentResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_input_new() {
        let input = AgentInput::new("read");
        assert_eq!(input.operation, "read");
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_agent_input_with_param() {
        let input = AgentInput::new("read")
            .with_param("kitchen_id", json!(1))
            .with_param("name", json!("milk"));

        assert_eq!(input.params.len(), 2);
        assert_eq!(input.params.get("kitchen_id").unwrap(), &json!(1));
    }

    #[test]
    fn test_param_str_success() {
        let input = AgentInput::new("read").with_param("name", json!("milk"));
        assert_eq!(input.param_str("name").unwrap(), "milk");
    }

    #[test]
    fn test_param_str_missing() {
        let input = AgentInput::new("read");
        let result = input.param_str("missing");
        assert!(matches!(
            result.unwrap_err(),
            AgentParamError::MissingParameter(_)
        ));
    }

    #[test]
    fn test_param_i64() {
        let input = AgentInput::new("read").with_param("count", json!(42));
        assert_eq!(input.param_i64("count").unwrap(), 42);
        assert!(input.param_i64("missing").is_err());
    }

    #[test]
    fn test_param_f64_widens_integers() {
        let input = AgentInput::new("read")
            .with_param("quantity", json!(3))
            .with_param("confidence", json!(0.8));

        assert_eq!(input.param_f64("quantity").unwrap(), 3.0);
        assert_eq!(input.param_f64("confidence").unwrap(), 0.8);
    }

    #[test]
    fn test_param_opt_accessors() {
        let input = AgentInput::new("read").with_param("name", json!("milk"));
        assert_eq!(input.param_str_opt("name"), Some("milk".to_string()));
        assert_eq!(input.param_str_opt("missing"), None);
        assert_eq!(input.param_i64_opt("missing"), None);
        assert_eq!(input.param_f64_opt("missing"), None);
    }

    #[test]
    fn test_param_json() {
        let input = AgentInput::new("read").with_param("data", json!({"nested": true}));
        assert_eq!(input.param_json("data").unwrap(), &json!({"nested": true}));
        assert!(input.param_json("missing").is_err());
    }

    #[test]
    fn test_agent_result_ok() {
        let result = AgentResult::ok(json!({"inventory": []}), 1.0);
        assert!(result.success);
        assert_eq!(result.confidence, 1.0);
        assert!(result.error_message.is_none());
        assert!(result.side_effects.is_empty());
    }

    #[test]
    fn test_agent_result_fail() {
        let result = AgentResult::fail("backend unreachable");
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(
            result.error_message.as_deref(),
            Some("backend unreachable")
        );
    }

    #[test]
    fn test_agent_result_confidence_clamped() {
        let high = AgentResult::ok(json!({}), 1.5);
        assert_eq!(high.confidence, 1.0);

        let low = AgentResult::ok(json!({}), -0.5);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_agent_result_builders() {
        let result = AgentResult::ok(json!({}), 0.9)
            .with_side_effect("inventory_write")
            .with_meta("elapsed_ms", json!(12));

        assert_eq!(result.side_effects, vec!["inventory_write"]);
        assert_eq!(result.metadata.get("elapsed_ms").unwrap(), &json!(12));
    }

    #[test]
    fn test_agent_result_data_accessors() {
        let result = AgentResult::ok(
            json!({"intent": "greeting", "confidence": 0.9, "is_valid": true}),
            0.9,
        );
        assert_eq!(result.data_str("intent"), Some("greeting"));
        assert_eq!(result.data_f64("confidence"), Some(0.9));
        assert_eq!(result.data_bool("is_valid"), Some(true));
        assert_eq!(result.data_str("missing"), None);
    }

    #[test]
    fn test_agent_result_serialization() {
        let result = AgentResult::ok(json!({"intent": "help"}), 0.3);
        let serialized = serde_json::to_string(&result).unwrap();
        let deserialized: AgentResult = serde_json::from_str(&serialized).unwrap();

        assert_eq!(result.success, deserialized.success);
        assert_eq!(result.data, deserialized.data);
        assert_eq!(result.confidence, deserialized.confidence);
    }
}
