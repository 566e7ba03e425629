//! Recipe Agent
//!
//! Suggests dishes from what is actually in the pantry: reads the inventory,
//! asks the larger model tier for suggestions under a JSON-array contract,
//! and parses the reply leniently. Strictly read-only: write operations are
//! refused here as well as at the governor.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::backend::KitchenBackend;
use crate::llm::{extract_json_array, ChatModel, CompletionOptions, Message};

/// Maximum number of pantry items named in the prompt
const MAX_PROMPT_INGREDIENTS: usize = 20;

/// One suggested recipe
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: u32,
}

pub struct RecipeAgent {
    backend: Arc<KitchenBackend>,
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl RecipeAgent {
    pub fn new(backend: Arc<KitchenBackend>, model: Arc<dyn ChatModel>, model_id: String) -> Self {
        Self {
            backend,
            model,
            model_id,
        }
    }

    fn suggestion_prompt(ingredients: &[String]) -> String {
        format!(
            "Suggest up to 3 dishes that can be cooked with these pantry ingredients: {}.\n\n\
            Respond with ONLY a JSON array. Each recipe object must have:\n\
            - \"name\": string\n\
            - \"ingredients\": array of strings\n\
            - \"instructions\": array of short step strings\n\
            - \"prep_time\": integer minutes\n\n\
            Output ONLY the JSON array, no markdown, no explanation.",
            ingredients.join(", ")
        )
    }

    fn parse_recipes(content: &str) -> Option<Vec<Recipe>> {
        let raw = extract_json_array(content)?;
        serde_json::from_str(raw).ok()
    }
}

#[async_trait]
impl CapabilityAgent for RecipeAgent {
    fn name(&self) -> &str {
        "recipe"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        if matches!(input.operation.as_str(), "create" | "update" | "delete") {
            return AgentResult::fail("Recipe agent is read-only");
        }

        let kitchen_id = match input.param_i64("kitchen_id") {
            Ok(id) => id,
            Err(e) => return AgentResult::fail(e.to_string()),
        };

        let inventory = match self.backend.get_inventory(kitchen_id).await {
            Ok(inventory) => inventory,
            Err(e) => return AgentResult::fail(format!("Failed to fetch ingredients: {e}")),
        };

        let ingredients: Vec<String> = inventory
            .iter()
            .filter(|item| item.total_quantity > 0.0)
            .map(|item| item.name.clone())
            .take(MAX_PROMPT_INGREDIENTS)
            .collect();

        if ingredients.is_empty() {
            return AgentResult::ok(json!({ "recipes": [] }), 0.9)
                .with_meta("recipe_count", json!(0));
        }

        let prompt = Self::suggestion_prompt(&ingredients);
        let options = CompletionOptions {
            temperature: 0.3,
            max_tokens: 512,
        };

        match self
            .model
            .complete(&self.model_id, &[Message::user(prompt)], options)
            .await
        {
            Ok(content) => match Self::parse_recipes(&content) {
                Some(recipes) => {
                    let recipe_count = recipes.len();
                    AgentResult::ok(json!({ "recipes": recipes }), 0.88)
                        .with_meta("recipe_count", json!(recipe_count))
                }
                None => {
                    warn!("Unparseable recipe output: {}", content);
                    AgentResult::fail("Recipe suggestions could not be parsed")
                }
            },
            Err(e) => AgentResult::fail(format!("Recipe suggestion failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::llm::LlmError;

    struct StubModel {
        content: Option<&'static str>,
    }

    #[async_trait]
    impl ChatModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: CompletionOptions,
        ) -> crate::llm::Result<String> {
            match self.content {
                Some(content) => Ok(content.to_string()),
                None => Err(LlmError::ProviderUnavailable("stub".to_string())),
            }
        }
    }

    fn agent(content: Option<&'static str>) -> RecipeAgent {
        RecipeAgent::new(
            Arc::new(KitchenBackend::new(&BackendConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 1,
            })),
            Arc::new(StubModel { content }),
            "smart-model".to_string(),
        )
    }

    #[tokio::test]
    async fn test_write_operations_refused() {
        let agent = agent(Some("[]"));
        for operation in ["create", "update", "delete"] {
            let input = AgentInput::new(operation).with_param("kitchen_id", json!(1));
            let result = agent.execute(input).await;
            assert!(!result.success, "{operation} must be refused");
            assert!(result.error_message.unwrap().contains("read-only"));
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_folds_into_failure() {
        let agent = agent(Some("[]"));
        let input = AgentInput::new("suggest").with_param("kitchen_id", json!(1));

        let result = agent.execute(input).await;
        assert!(!result.success);
        assert!(result
            .error_message
            .unwrap()
            .contains("Failed to fetch ingredients"));
    }

    #[test]
    fn test_parse_recipes_plain_array() {
        let content = r#"[{"name": "Quick Pasta", "ingredients": ["pasta"], "instructions": ["Boil pasta"], "prep_time": 15}]"#;
        let recipes = RecipeAgent::parse_recipes(content).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "Quick Pasta");
        assert_eq!(recipes[0].prep_time, 15);
    }

    #[test]
    fn test_parse_recipes_with_prose_wrapper() {
        let content = "Here you go!\n[{\"name\": \"Omelette\"}]\nEnjoy.";
        let recipes = RecipeAgent::parse_recipes(content).unwrap();
        assert_eq!(recipes[0].name, "Omelette");
        // Missing fields default
        assert!(recipes[0].ingredients.is_empty());
    }

    #[test]
    fn test_parse_recipes_rejects_garbage() {
        assert!(RecipeAgent::parse_recipes("no recipes today").is_none());
    }

    #[test]
    fn test_prompt_lists_ingredients() {
        let prompt =
            RecipeAgent::suggestion_prompt(&["Rice".to_string(), "Tomatoes".to_string()]);
        assert!(prompt.contains("Rice, Tomatoes"));
        assert!(prompt.contains("JSON array"));
    }
}
