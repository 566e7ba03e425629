//! Inventory Agent
//!
//! CRUD operations against the kitchen backend. Write operations report
//! side-effect tags so downstream policy (validation routing) can see them.

use async_trait::async_trait;
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::json;
use std::sync::Arc;

use crate::backend::{ExtractedItem, KitchenBackend};

pub struct InventoryAgent {
    backend: Arc<KitchenBackend>,
}

impl InventoryAgent {
    pub fn new(backend: Arc<KitchenBackend>) -> Self {
        Self { backend }
    }

    async fn read(&self, kitchen_id: i64) -> AgentResult {
        match self.backend.get_inventory(kitchen_id).await {
            Ok(inventory) => AgentResult::ok(json!({ "inventory": inventory }), 1.0)
                .with_side_effect("inventory_read"),
            Err(e) => AgentResult::fail(format!("Failed to fetch inventory: {e}")),
        }
    }

    async fn create(&self, kitchen_id: i64, input: &AgentInput) -> AgentResult {
        let Some(name) = input.param_str_opt("name") else {
            return AgentResult::fail("Item name is required");
        };
        let quantity = input.param_f64_opt("quantity").unwrap_or(1.0);
        let unit = input.param_str_opt("unit").unwrap_or_default();
        let category = input
            .param_str_opt("category")
            .unwrap_or_else(|| "Other".to_string());

        match self
            .backend
            .create_item(kitchen_id, &name, quantity, &unit, &category)
            .await
        {
            Ok(()) => AgentResult::ok(json!({ "created": true, "name": name }), 0.9)
                .with_side_effect("inventory_write")
                .with_side_effect("stock_changed"),
            Err(e) => AgentResult::fail(format!("Failed to create item: {e}")),
        }
    }

    async fn update(&self, kitchen_id: i64, input: &AgentInput) -> AgentResult {
        let Some(item_id) = input.param_str_opt("canonical_item_id") else {
            return AgentResult::fail("canonical_item_id is required");
        };
        let quantity = input.param_f64_opt("quantity").unwrap_or(0.0);

        match self.backend.update_item(kitchen_id, &item_id, quantity).await {
            Ok(()) => AgentResult::ok(json!({ "updated": true }), 0.9)
                .with_side_effect("inventory_write")
                .with_side_effect("stock_changed"),
            Err(e) => AgentResult::fail(format!("Failed to update item: {e}")),
        }
    }

    async fn delete(&self, kitchen_id: i64, input: &AgentInput) -> AgentResult {
        let Some(name) = input.param_str_opt("name") else {
            return AgentResult::fail("Item name is required");
        };

        match self.backend.delete_item(kitchen_id, &name).await {
            Ok(()) => AgentResult::ok(json!({ "deleted": true }), 0.9)
                .with_side_effect("inventory_write")
                .with_side_effect("stock_changed"),
            Err(e) => AgentResult::fail(format!("Failed to delete item: {e}")),
        }
    }

    async fn bulk_add(&self, kitchen_id: i64, input: &AgentInput) -> AgentResult {
        let items: Vec<ExtractedItem> = input
            .param_json("items")
            .ok()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        if items.is_empty() {
            return AgentResult::fail("No items to add");
        }

        match self.backend.bulk_add(kitchen_id, &items).await {
            Ok(count) => AgentResult::ok(json!({ "added_count": count }), 0.85)
                .with_side_effect("inventory_write")
                .with_side_effect("bulk_stock_changed"),
            Err(e) => AgentResult::fail(format!("Failed to bulk-add items: {e}")),
        }
    }
}

#[async_trait]
impl CapabilityAgent for InventoryAgent {
    fn name(&self) -> &str {
        "inventory"
    }

    async fn execute(&self, input: AgentInput) -> AgentResult {
        let kitchen_id = match input.param_i64("kitchen_id") {
            Ok(id) => id,
            Err(e) => return AgentResult::fail(e.to_string()),
        };

        match input.operation.as_str() {
            "read" => self.read(kitchen_id).await,
            "create" => self.create(kitchen_id, &input).await,
            "update" => self.update(kitchen_id, &input).await,
            "delete" => self.delete(kitchen_id, &input).await,
            "bulk_add" => self.bulk_add(kitchen_id, &input).await,
            other => AgentResult::fail(format!("Unknown operation: {other}")),
        }
    }
}
