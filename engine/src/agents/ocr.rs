//! OCR Agent
//!
//! Hands a receipt image to the backend OCR pipeline and reports the
//! extracted items with the pipeline's confidence. The image itself never
//! leaves this boundary; the orchestration core only sees structured items.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::json;
use std::sync::Arc;

use crate::backend::KitchenBackend;

pub struct OcrAgent {
    backend: Arc<KitchenBackend>,
}

impl OcrAgent {
    pub fn new(backend: Arc<KitchenBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CapabilityAgent for OcrAgent {
    fn name(&self) -> &str {
        "ocr"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        if input.operation != "scan" {
            return AgentResult::fail(format!("Unknown operation: {}", input.operation));
        }

        let kitchen_id = match input.param_i64("kitchen_id") {
            Ok(id) => id,
            Err(e) => return AgentResult::fail(e.to_string()),
        };

        let image_data = match input.param_str_opt("image_data") {
            Some(image_data) if !image_data.is_empty() => image_data,
            _ => return AgentResult::fail("image_data is required"),
        };

        match self.backend.scan_receipt(kitchen_id, &image_data).await {
            Ok(scan) => {
                let item_count = scan.extracted_items.len();
                AgentResult::ok(
                    json!({
                        "extracted_items": scan.extracted_items,
                        "raw_text": scan.raw_text,
                    }),
                    scan.confidence,
                )
                .with_side_effect("ocr_processed")
                .with_meta("item_count", json!(item_count))
            }
            Err(e) => AgentResult::fail(format!("Receipt scan failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn unreachable_agent() -> OcrAgent {
        OcrAgent::new(Arc::new(KitchenBackend::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        })))
    }

    #[tokio::test]
    async fn test_missing_image_data_fails() {
        let agent = unreachable_agent();
        let input = AgentInput::new("scan").with_param("kitchen_id", json!(1));

        let result = agent.execute(input).await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("image_data"));
    }

    #[tokio::test]
    async fn test_empty_image_data_fails() {
        let agent = unreachable_agent();
        let input = AgentInput::new("scan")
            .with_param("kitchen_id", json!(1))
            .with_param("image_data", json!(""));

        let result = agent.execute(input).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_unknown_operation_fails() {
        let agent = unreachable_agent();
        let input = AgentInput::new("develop_film")
            .with_param("kitchen_id", json!(1))
            .with_param("image_data", json!("payload"));

        let result = agent.execute(input).await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("Unknown operation"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_folds_into_failure() {
        let agent = unreachable_agent();
        let input = AgentInput::new("scan")
            .with_param("kitchen_id", json!(1))
            .with_param("image_data", json!("base64payload"));

        let result = agent.execute(input).await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("Receipt scan failed"));
    }
}
