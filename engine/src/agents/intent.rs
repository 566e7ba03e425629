//! Intent Agent
//!
//! Classifies a user utterance into one of the known intents with a single
//! call to the cheapest model tier. Model output is parsed leniently; if the
//! provider fails or returns garbage, a rule-based fallback keeps the request
//! moving with reduced confidence.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{extract_json_object, ChatModel, CompletionOptions, Message};

/// Words treated as greetings by the rule-based fallback, typos included
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "hii", "helo", "hai"];

/// Words that suggest an inventory query in the rule-based fallback
const INVENTORY_WORDS: &[&str] = &["inventory", "stock", "items", "show", "list"];

/// Classification payload expected from the model
#[derive(Debug, Deserialize)]
struct Classification {
    intent: Option<String>,
    confidence: Option<f64>,
    category: Option<String>,
}

pub struct IntentAgent {
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl IntentAgent {
    pub fn new(model: Arc<dyn ChatModel>, model_id: String) -> Self {
        Self { model, model_id }
    }

    fn classification_prompt(message: &str) -> String {
        format!(
            "Classify the user's intent for a pantry management system.\n\n\
            User message: \"{message}\"\n\n\
            Available intents:\n\
            - inventory_list: Show all inventory items\n\
            - inventory_category: Show items from a specific category (vegetables, fruits, dairy, etc.)\n\
            - inventory_add: Add new items to inventory\n\
            - inventory_consume: Remove/consume items from inventory\n\
            - inventory_check: Check specific items\n\
            - inventory_expiring: Show items expiring soon\n\
            - inventory_low_stock: Show items running low\n\
            - shopping_list: Show or manage the shopping list\n\
            - recipe: Find recipes or cooking suggestions\n\
            - greeting: Hello, hi, hey\n\
            - help: Help or guidance requests\n\n\
            Respond with ONLY a JSON object:\n\
            {{\"intent\": \"intent_name\", \"confidence\": 0.9, \"category\": \"category_name_if_applicable\"}}\n\n\
            Examples:\n\
            - \"show vegetables\" -> {{\"intent\": \"inventory_category\", \"confidence\": 0.9, \"category\": \"vegetables\"}}\n\
            - \"consume 200g rice\" -> {{\"intent\": \"inventory_consume\", \"confidence\": 0.9}}\n\
            - \"show inventory\" -> {{\"intent\": \"inventory_list\", \"confidence\": 0.9}}\n\
            - \"hello\" -> {{\"intent\": \"greeting\", \"confidence\": 1.0}}"
        )
    }

    fn parse_classification(content: &str) -> Option<AgentResult> {
        let raw = extract_json_object(content)?;
        let parsed: Classification = serde_json::from_str(raw).ok()?;

        let intent = parsed.intent.unwrap_or_else(|| "help".to_string());
        let confidence = parsed.confidence.unwrap_or(0.5);

        debug!("Parsed intent: {} ({:.2})", intent, confidence);

        Some(
            AgentResult::ok(
                json!({
                    "intent": intent,
                    "confidence": confidence,
                    "category": parsed.category,
                }),
                confidence,
            )
            .with_meta("classification", json!("llm")),
        )
    }

    /// Keyword fallback used when the model is unavailable or unparseable
    fn rule_based_fallback(message: &str) -> AgentResult {
        let lowered = message.to_lowercase();
        let trimmed = lowered.trim();

        if GREETING_WORDS.contains(&trimmed)
            || GREETING_WORDS.iter().any(|word| lowered.contains(word))
        {
            return AgentResult::ok(json!({"intent": "greeting", "confidence": 0.9}), 0.9)
                .with_meta("classification", json!("rule_fallback"));
        }

        if INVENTORY_WORDS.iter().any(|word| lowered.contains(word)) {
            return AgentResult::ok(json!({"intent": "inventory_list", "confidence": 0.8}), 0.8)
                .with_meta("classification", json!("rule_fallback"));
        }

        AgentResult::ok(json!({"intent": "help", "confidence": 0.3}), 0.3)
            .with_meta("classification", json!("rule_fallback"))
    }
}

#[async_trait]
impl CapabilityAgent for IntentAgent {
    fn name(&self) -> &str {
        "intent"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        let message = match input.param_str("message") {
            Ok(message) => message,
            Err(e) => return AgentResult::fail(e.to_string()),
        };

        let prompt = Self::classification_prompt(&message);
        let options = CompletionOptions {
            temperature: 0.1,
            max_tokens: 100,
        };

        match self
            .model
            .complete(&self.model_id, &[Message::user(prompt)], options)
            .await
        {
            Ok(content) => match Self::parse_classification(&content) {
                Some(result) => result,
                None => {
                    warn!("Unparseable classification output: {}", content);
                    // The model answered in prose; look for an intent name
                    // before giving up on it entirely.
                    for intent in ["inventory_category", "inventory_list"] {
                        if content.contains(intent) {
                            return AgentResult::ok(
                                json!({"intent": intent, "confidence": 0.8}),
                                0.8,
                            )
                            .with_meta("classification", json!("llm_fallback"));
                        }
                    }
                    Self::rule_based_fallback(&message)
                }
            },
            Err(e) => {
                warn!("Intent classification call failed: {}", e);
                Self::rule_based_fallback(&message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    /// Model stub returning a fixed reply, or an error when `content` is None
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

    fn agent(content: Option<&'static str>) -> IntentAgent {
        IntentAgent::new(Arc::new(StubModel { content }), "fast-model".to_string())
    }

    fn classify_input(message: &str) -> AgentInput {
        AgentInput::new("classify").with_param("message", json!(message))
    }

    #[tokio::test]
    async fn test_parses_clean_json() {
        let agent = agent(Some(r#"{"intent": "inventory_list", "confidence": 0.92}"#));
        let result = agent.execute(classify_input("show inventory please")).await;

        assert!(result.success);
        assert_eq!(result.data_str("intent"), Some("inventory_list"));
        assert_eq!(result.data_f64("confidence"), Some(0.92));
        assert_eq!(result.metadata.get("classification").unwrap(), "llm");
    }

    #[tokio::test]
    async fn test_parses_fenced_json_with_category() {
        let agent = agent(Some(
            "```json\n{\"intent\": \"inventory_category\", \"confidence\": 0.9, \"category\": \"vegetables\"}\n```",
        ));
        let result = agent.execute(classify_input("show vegetables")).await;

        assert_eq!(result.data_str("intent"), Some("inventory_category"));
        assert_eq!(result.data_str("category"), Some("vegetables"));
    }

    #[tokio::test]
    async fn test_prose_mentioning_intent_name() {
        let agent = agent(Some("The intent here is inventory_list I believe."));
        let result = agent.execute(classify_input("what's in the pantry")).await;

        assert_eq!(result.data_str("intent"), Some("inventory_list"));
        assert_eq!(result.data_f64("confidence"), Some(0.8));
        assert_eq!(result.metadata.get("classification").unwrap(), "llm_fallback");
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_rules_greeting() {
        let agent = agent(None);
        let result = agent.execute(classify_input("hey there")).await;

        assert!(result.success);
        assert_eq!(result.data_str("intent"), Some("greeting"));
        assert_eq!(result.data_f64("confidence"), Some(0.9));
        assert_eq!(
            result.metadata.get("classification").unwrap(),
            "rule_fallback"
        );
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_rules_inventory() {
        let agent = agent(None);
        let result = agent.execute(classify_input("what stock do we carry")).await;

        assert_eq!(result.data_str("intent"), Some("inventory_list"));
        assert_eq!(result.data_f64("confidence"), Some(0.8));
    }

    #[tokio::test]
    async fn test_provider_error_defaults_to_low_confidence_help() {
        let agent = agent(None);
        let result = agent.execute(classify_input("qwzzk blorp")).await;

        assert_eq!(result.data_str("intent"), Some("help"));
        assert_eq!(result.data_f64("confidence"), Some(0.3));
    }

    #[tokio::test]
    async fn test_missing_message_param_fails() {
        let agent = agent(Some("{}"));
        let result = agent.execute(AgentInput::new("classify")).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("message"));
    }

    #[tokio::test]
    async fn test_missing_intent_defaults_to_help() {
        let agent = agent(Some(r#"{"confidence": 0.4}"#));
        let result = agent.execute(classify_input("hmm")).await;

        assert_eq!(result.data_str("intent"), Some("help"));
        assert_eq!(result.data_f64("confidence"), Some(0.4));
    }
}
