//! Validator Agent
//!
//! Pure validation over data produced earlier in the request: OCR extraction
//! results, inventory write payloads, and generic required-field schemas.
//! The validator itself always succeeds when the validation type is known;
//! verdicts travel in `data.is_valid` and `data.errors`.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::{json, Value};

/// Minimum acceptable OCR confidence
const OCR_CONFIDENCE_FLOOR: f64 = 0.8;

#[derive(Default)]
pub struct ValidatorAgent;

impl ValidatorAgent {
    pub fn new() -> Self {
        Self
    }

    fn validate_ocr_result(data: &Value) -> AgentResult {
        let mut errors: Vec<String> = Vec::new();

        let confidence = data.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if confidence < OCR_CONFIDENCE_FLOOR {
            errors.push("OCR confidence too low".to_string());
        }

        let items = data
            .get("extracted_items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if items.is_empty() {
            errors.push("No items extracted".to_string());
        }

        for item in &items {
            let name = item.get("name").and_then(|v| v.as_str()).unwrap_or("");
            if name.is_empty() {
                errors.push("Item missing name".to_string());
            }

            let quantity = item.get("quantity").and_then(|v| v.as_f64()).unwrap_or(0.0);
            if quantity <= 0.0 {
                let label = if name.is_empty() { "unknown item" } else { name };
                errors.push(format!("Invalid quantity for {label}"));
            }
        }

        AgentResult::ok(
            json!({
                "is_valid": errors.is_empty(),
                "errors": errors,
                "validated_items": items.len(),
            }),
            1.0,
        )
        .with_meta("validation_type", json!("ocr_result"))
    }

    fn validate_inventory_write(data: &Value) -> AgentResult {
        let mut errors: Vec<String> = Vec::new();

        for field in ["name", "quantity", "unit"] {
            let present = match data.get(field) {
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Null) | None => false,
                Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
                Some(_) => true,
            };
            if !present {
                errors.push(format!("Missing required field: {field}"));
            }
        }

        let quantity = data.get("quantity").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if quantity < 0.0 {
            errors.push("Quantity cannot be negative".to_string());
        }

        AgentResult::ok(
            json!({
                "is_valid": errors.is_empty(),
                "errors": errors,
            }),
            1.0,
        )
        .with_meta("validation_type", json!("inventory_write"))
    }

    fn validate_schema(data: &Value, schema: Option<&Value>) -> AgentResult {
        let mut errors: Vec<String> = Vec::new();

        let required = schema
            .and_then(|s| s.get("required"))
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        for field in required.iter().filter_map(|f| f.as_str()) {
            if data.get(field).is_none() {
                errors.push(format!("Missing required field: {field}"));
            }
        }

        AgentResult::ok(
            json!({
                "is_valid": errors.is_empty(),
                "errors": errors,
            }),
            1.0,
        )
        .with_meta("validation_type", json!("schema"))
    }
}

#[async_trait]
impl CapabilityAgent for ValidatorAgent {
    fn name(&self) -> &str {
        "validator"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        let validation_type = input.param_str_opt("validation_type").unwrap_or_default();
        let empty = json!({});
        let data = input.param_json("data").unwrap_or(&empty);

        match validation_type.as_str() {
            "ocr_result" => Self::validate_ocr_result(data),
            "inventory_write" => Self::validate_inventory_write(data),
            "schema" => Self::validate_schema(data, input.param_json("schema").ok()),
            other => AgentResult {
                success: false,
                data: json!({ "is_valid": false }),
                confidence: 1.0,
                error_message: Some(format!("Unknown validation type: {other}")),
                side_effects: Vec::new(),
                metadata: serde_json::Map::new(),
            },
        }
    }
}
