//! Kitchen backend client
//!
//! HTTP client for the kitchen inventory backend. Inventory, shopping list,
//! and receipt-scan state live behind this boundary; the engine only sees the
//! narrow operations below. All calls are blocking with a fixed timeout and
//! are never retried here.

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;

/// One inventory row as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryItem {
    pub name: String,
    pub total_quantity: f64,
    pub unit_name: String,
    pub category_name: String,
    pub expiry_date: Option<String>,
}

/// One shopping list entry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ShoppingItem {
    pub item_name: String,
    pub quantity: f64,
}

/// Aggregate pantry statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_items: i64,
    pub expiring_items: i64,
}

/// Item extracted from a receipt by the backend OCR pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub price: f64,
}

/// Result of scanning a receipt image
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptScan {
    pub extracted_items: Vec<ExtractedItem>,
    pub raw_text: String,
    pub confidence: f64,
}

/// Client for the kitchen backend
pub struct KitchenBackend {
    base_url: String,
    client: reqwest::Client,
}

impl KitchenBackend {
    /// Create a new backend client from configuration
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fetch all inventory rows for a kitchen
    pub async fn get_inventory(&self, kitchen_id: i64) -> Result<Vec<InventoryItem>, EngineError> {
        self.post_json(
            "/api/internal/inventory/getAll",
            json!({ "kitchenId": kitchen_id }),
        )
        .await
    }

    /// Fetch items expiring soon
    pub async fn get_expiring(&self, kitchen_id: i64) -> Result<Vec<InventoryItem>, EngineError> {
        self.post_json(
            "/api/internal/inventory/getExpiring",
            json!({ "kitchenId": kitchen_id }),
        )
        .await
    }

    /// Create a single inventory item
    pub async fn create_item(
        &self,
        kitchen_id: i64,
        name: &str,
        quantity: f64,
        unit: &str,
        category: &str,
    ) -> Result<(), EngineError> {
        self.post_ack(
            "/api/internal/inventory/add",
            json!({
                "kitchenId": kitchen_id,
                "name": name,
                "quantity": quantity,
                "unit": unit,
                "category": category,
            }),
        )
        .await
    }

    /// Update the stock level of an existing item
    pub async fn update_item(
        &self,
        kitchen_id: i64,
        canonical_item_id: &str,
        quantity: f64,
    ) -> Result<(), EngineError> {
        self.post_ack(
            "/api/internal/inventory/update",
            json!({
                "kitchenId": kitchen_id,
                "canonicalItemId": canonical_item_id,
                "quantity": quantity,
            }),
        )
        .await
    }

    /// Delete an item by name
    pub async fn delete_item(&self, kitchen_id: i64, name: &str) -> Result<(), EngineError> {
        self.post_ack(
            "/api/internal/inventory/delete",
            json!({ "kitchenId": kitchen_id, "name": name }),
        )
        .await
    }

    /// Bulk-add items (typically after a receipt scan)
    pub async fn bulk_add(
        &self,
        kitchen_id: i64,
        items: &[ExtractedItem],
    ) -> Result<usize, EngineError> {
        self.post_ack(
            "/api/internal/inventory/bulkAdd",
            json!({ "kitchenId": kitchen_id, "items": items }),
        )
        .await?;
        Ok(items.len())
    }

    /// Fetch the shopping list entries for a kitchen
    pub async fn get_shopping_lists(
        &self,
        kitchen_id: i64,
    ) -> Result<Vec<ShoppingItem>, EngineError> {
        self.post_json(
            "/api/internal/shopping/getLists",
            json!({ "kitchenId": kitchen_id }),
        )
        .await
    }

    /// Fetch aggregate pantry statistics
    pub async fn get_stats(&self, kitchen_id: i64) -> Result<DashboardStats, EngineError> {
        self.post_json(
            "/api/internal/dashboard/stats",
            json!({ "kitchenId": kitchen_id }),
        )
        .await
    }

    /// Run the backend OCR pipeline over a receipt image (base64 payload)
    pub async fn scan_receipt(
        &self,
        kitchen_id: i64,
        image_data: &str,
    ) -> Result<ReceiptScan, EngineError> {
        self.post_json(
            "/api/internal/receipts/scan",
            json!({ "kitchenId": kitchen_id, "imageData": image_data }),
        )
        .await
    }

    /// POST a JSON body and deserialize the JSON response
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Backend call: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Backend(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Backend(format!("Invalid response from {path}: {e}")))
    }

    /// POST a JSON body, only checking for a success status
    async fn post_ack(&self, path: &str, body: serde_json::Value) -> Result<(), EngineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Backend call: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Backend(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = KitchenBackend::new(&BackendConfig {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 10,
        });
        assert_eq!(backend.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_inventory_item_deserialization() {
        let raw = r#"{"name": "Milk", "totalQuantity": 2.0, "unitName": "l", "categoryName": "Dairy"}"#;
        let item: InventoryItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.name, "Milk");
        assert_eq!(item.total_quantity, 2.0);
        assert_eq!(item.unit_name, "l");
        assert!(item.expiry_date.is_none());
    }

    #[test]
    fn test_inventory_item_tolerates_missing_fields() {
        let item: InventoryItem = serde_json::from_str(r#"{"name": "Bread"}"#).unwrap();
        assert_eq!(item.name, "Bread");
        assert_eq!(item.total_quantity, 0.0);
    }

    #[test]
    fn test_receipt_scan_deserialization() {
        let raw = r#"{
            "extractedItems": [{"name": "Milk", "quantity": 1, "unit": "gallon", "price": 3.99}],
            "rawText": "MILK 3.99",
            "confidence": 0.92
        }"#;
        let scan: ReceiptScan = serde_json::from_str(raw).unwrap();
        assert_eq!(scan.extracted_items.len(), 1);
        assert_eq!(scan.extracted_items[0].price, 3.99);
        assert_eq!(scan.confidence, 0.92);
    }
}
