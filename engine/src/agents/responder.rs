//! Responder Agent
//!
//! Formats the final reply from the request context: reason-specific error
//! templates on the error path, per-intent formatting on the success path.
//! Internal field names and failure details never leak; unmapped causes fall
//! back to a generic apology carrying only the human-readable reason.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::{json, Value};

const GREETING_TEXT: &str = "Hello! 👋 I'm your Larder assistant. I can help you manage your \
inventory, find recipes, process receipts, and analyze your pantry data. What would you like \
to do today?";

const HELP_TEXT: &str = "🤖 **Larder Assistant Help**\n\n\
I can help you with:\n\n\
📦 **Inventory Management**\n\
• \"Check my inventory\" - View all items\n\
• \"Add milk to inventory\" - Add new items\n\
• \"Update bread quantity to 2\" - Modify existing items\n\n\
🍳 **Recipe Suggestions**\n\
• \"What can I cook?\" - Get recipes based on your ingredients\n\
• \"Find pasta recipes\" - Search for specific recipes\n\n\
📄 **Receipt Processing**\n\
• \"Process my receipt\" - Extract items from receipts\n\n\
📊 **Analytics**\n\
• \"Show my pantry stats\" - Get inventory analytics and reports\n\n\
Just ask me naturally, and I'll help you manage your pantry efficiently!";

#[derive(Default)]
pub struct ResponderAgent;

impl ResponderAgent {
    pub fn new() -> Self {
        Self
    }

    fn error_response(context: &Value) -> AgentResult {
        let reason = context
            .get("error_reason")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");

        let response = match reason {
            "Low intent confidence" => {
                "I'm not sure what you're asking for. Could you please be more specific? \
                 For example, you can ask me to 'check inventory', 'add new item', or \
                 'find recipes'."
                    .to_string()
            }
            "OCR confidence too low" => {
                "I had trouble reading your receipt clearly. Could you try uploading a \
                 clearer image or manually enter the items?"
                    .to_string()
            }
            "Validation failed" => {
                "There was an issue with the data provided. Please check your input and \
                 try again."
                    .to_string()
            }
            "Exceeds max plan steps" => {
                "Your request is too complex. Please break it down into smaller, specific \
                 tasks."
                    .to_string()
            }
            other => format!("Sorry, there was an error: {other}"),
        };

        AgentResult::ok(json!({ "response": response }), 1.0)
            .with_meta("response_type", json!("error"))
    }

    fn success_response(context: &Value) -> AgentResult {
        let results = context
            .get("execution_results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        // Direct-response plans resolve on the plan step, not the intent
        if let Some(first_tool) = context
            .get("plan_steps")
            .and_then(|v| v.as_array())
            .and_then(|steps| steps.first())
            .and_then(|step| step.get("tool"))
            .and_then(|tool| tool.as_str())
        {
            match first_tool {
                "greeting" => return Self::greeting_response(),
                "help" => return Self::help_response(),
                _ => {}
            }
        }

        let intent = context.get("intent").and_then(|v| v.as_str()).unwrap_or("");

        match intent {
            i if i.starts_with("inventory") => Self::inventory_response(&results),
            "recipe" => Self::recipe_response(&results),
            "ocr" | "receipt" => Self::ocr_response(&results),
            "analytics" => Self::analytics_response(&results),
            "greeting" => Self::greeting_response(),
            "help" => Self::help_response(),
            _ => Self::generic_response(),
        }
    }

    fn inventory_response(results: &[Value]) -> AgentResult {
        let response = match results.first() {
            None => "No inventory data available.".to_string(),
            Some(result) => {
                let operation = result.get("operation").and_then(|v| v.as_str());
                if operation == Some("read") {
                    let inventory = result
                        .get("data")
                        .and_then(|d| d.get("inventory"))
                        .and_then(|i| i.as_array())
                        .cloned()
                        .unwrap_or_default();

                    let mut text = format!(
                        "Found {} items in your pantry. Here's what you have:\n",
                        inventory.len()
                    );
                    for item in inventory.iter().take(5) {
                        text.push_str(&format!(
                            "• {} - {} {}\n",
                            field_str(item, &["name"]).unwrap_or("Unknown"),
                            field_f64(item, &["quantity", "totalQuantity"]).unwrap_or(0.0),
                            field_str(item, &["unit", "unitName"]).unwrap_or(""),
                        ));
                    }
                    if inventory.len() > 5 {
                        text.push_str(&format!("... and {} more items.", inventory.len() - 5));
                    }
                    text
                } else {
                    "Inventory updated successfully!".to_string()
                }
            }
        };

        AgentResult::ok(json!({ "response": response }), 0.9)
            .with_meta("response_type", json!("inventory"))
    }

    fn recipe_response(results: &[Value]) -> AgentResult {
        let mut recipes: Vec<Value> = Vec::new();
        for result in results {
            if let Some(found) = result
                .get("data")
                .and_then(|d| d.get("recipes"))
                .and_then(|r| r.as_array())
            {
                recipes.extend(found.iter().cloned());
            }
        }

        let response = if recipes.is_empty() {
            "No recipes found with your available ingredients.".to_string()
        } else {
            let mut text = format!("I found {} recipe(s) you can make:\n\n", recipes.len());
            for recipe in recipes.iter().take(3) {
                text.push_str(&format!(
                    "🍽️ **{}**\n",
                    field_str(recipe, &["name"]).unwrap_or("Unknown Recipe")
                ));
                text.push_str(&format!(
                    "⏱️ Prep time: {} minutes\n",
                    field_f64(recipe, &["prep_time"]).unwrap_or(0.0)
                ));
                let ingredients: Vec<&str> = recipe
                    .get("ingredients")
                    .and_then(|i| i.as_array())
                    .map(|items| items.iter().filter_map(|v| v.as_str()).take(5).collect())
                    .unwrap_or_default();
                text.push_str(&format!("📝 Ingredients: {}\n\n", ingredients.join(", ")));
            }
            text
        };

        AgentResult::ok(json!({ "response": response }), 0.9)
            .with_meta("response_type", json!("recipe"))
    }

    fn ocr_response(results: &[Value]) -> AgentResult {
        let mut items: Vec<Value> = Vec::new();
        for result in results {
            if let Some(found) = result
                .get("data")
                .and_then(|d| d.get("extracted_items"))
                .and_then(|i| i.as_array())
            {
                items.extend(found.iter().cloned());
            }
        }

        let response = if items.is_empty() {
            "No items could be extracted from the receipt.".to_string()
        } else {
            let mut text = format!(
                "Successfully extracted {} items from your receipt:\n\n",
                items.len()
            );
            for item in &items {
                text.push_str(&format!(
                    "• {} - {} {} (${:.2})\n",
                    field_str(item, &["name"]).unwrap_or("Unknown"),
                    field_f64(item, &["quantity"]).unwrap_or(0.0),
                    field_str(item, &["unit"]).unwrap_or(""),
                    field_f64(item, &["price"]).unwrap_or(0.0),
                ));
            }
            text.push_str("\nThese items have been added to your inventory!");
            text
        };

        AgentResult::ok(json!({ "response": response }), 0.9)
            .with_meta("response_type", json!("ocr"))
    }

    fn analytics_response(results: &[Value]) -> AgentResult {
        let stats = results
            .iter()
            .find_map(|result| result.get("data").filter(|d| d.get("totalItems").is_some()));

        let response = match stats {
            Some(stats) => format!(
                "Here's your pantry analytics summary:\n\n\
                 📊 Total items: {}\n\
                 ⚠️ Items expiring soon: {}\n",
                field_f64(stats, &["totalItems"]).unwrap_or(0.0),
                field_f64(stats, &["expiringItems"]).unwrap_or(0.0),
            ),
            None => "Here's your pantry analytics summary. No stats are available right now."
                .to_string(),
        };

        AgentResult::ok(json!({ "response": response }), 0.9)
            .with_meta("response_type", json!("analytics"))
    }

    fn greeting_response() -> AgentResult {
        AgentResult::ok(json!({ "response": GREETING_TEXT }), 1.0)
            .with_meta("response_type", json!("greeting"))
    }

    fn help_response() -> AgentResult {
        AgentResult::ok(json!({ "response": HELP_TEXT }), 1.0)
            .with_meta("response_type", json!("help"))
    }

    fn generic_response() -> AgentResult {
        AgentResult::ok(
            json!({
                "response": "I've completed your request. Is there anything else I can help you with?"
            }),
            0.8,
        )
        .with_meta("response_type", json!("generic"))
    }
}

/// First present string field among the given names
fn field_str<'a>(value: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| value.get(name).and_then(|v| v.as_str()))
}

/// First present numeric field among the given names
fn field_f64(value: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| value.get(name).and_then(|v| v.as_f64()))
}

#[async_trait]
impl CapabilityAgent for ResponderAgent {
    fn name(&self) -> &str {
        "responder"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        let execution_state = input.param_str_opt("execution_state").unwrap_or_default();
        let empty = json!({});
        let context = input.param_json("context").unwrap_or(&empty);

        match execution_state.as_str() {
            "error" => Self::error_response(context),
            "success" => Self::success_response(context),
            _ => Self::help_response(),
        }
    }
}
