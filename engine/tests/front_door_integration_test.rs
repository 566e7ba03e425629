//! Integration tests for the cost-aware front door against a mock backend
//!
//! Drives the optimized state machine end to end: exit gates resolving to
//! direct backend calls, classification-driven dispatch, and the fallback to
//! the full governed loop.

use async_trait::async_trait;
use larder_engine::agents::{ResponderAgent, ValidatorAgent};
use larder_engine::backend::KitchenBackend;
use larder_engine::config::{BackendConfig, LlmConfig};
use larder_engine::driver::{AgentSet, OptimizedStateMachine, StateMachine};
use larder_engine::governor::{Governor, GovernorRules};
use larder_engine::history::ConversationHistory;
use larder_engine::optimizer::{CostOptimizer, InMemoryIntentCache, OptimizerConfig};
use sdk::agent::{AgentInput, AgentResult, CapabilityAgent};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubAgent {
    result: AgentResult,
}

#[async_trait]
impl CapabilityAgent for StubAgent {
    fn name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, _input: AgentInput) -> AgentResult {
        self.result.clone()
    }
}

fn stub(result: AgentResult) -> Arc<dyn CapabilityAgent> {
    Arc::new(StubAgent { result })
}

fn front_door(server: &MockServer, intent_result: AgentResult) -> OptimizedStateMachine {
    let backend = Arc::new(KitchenBackend::new(&BackendConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    }));
    let optimizer = CostOptimizer::new(
        &OptimizerConfig::default(),
        &LlmConfig::default(),
        Arc::new(InMemoryIntentCache::new()),
    )
    .unwrap();

    let agents = AgentSet {
        intent: stub(intent_result),
        planner: stub(AgentResult::fail("unused")),
        inventory: stub(AgentResult::fail("unused")),
        ocr: stub(AgentResult::fail("unused")),
        recipe: stub(AgentResult::fail("unused")),
        validator: Arc::new(ValidatorAgent::new()),
        responder: Arc::new(ResponderAgent::new()),
    };
    let inner = StateMachine::new(Governor::new(GovernorRules::default()), agents);

    OptimizedStateMachine::new(inner, optimizer, backend, ConversationHistory::new())
}

async fn mount_inventory(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getAll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rule_gate_lists_inventory_directly() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([
            {"name": "Milk", "totalQuantity": 2.0, "unitName": "l"},
            {"name": "Rice", "totalQuantity": 5.0, "unitName": "kg"},
            {"name": "Flour", "totalQuantity": 0.0, "unitName": "kg"}
        ]),
    )
    .await;

    let machine = front_door(&server, AgentResult::fail("intent agent must not run"));
    let reply = machine.process_message("show inventory", 1, "a@example.com").await;

    assert!(reply.contains("You have 2 items in stock"), "reply: {reply}");
    assert!(reply.contains("Milk"), "reply: {reply}");
    assert!(reply.contains("1 items are out of stock"), "reply: {reply}");

    let stats = machine.stats();
    assert_eq!(stats.early_exits, 1);
    assert_eq!(stats.llm_calls, 0);
    assert_eq!(stats.backend_direct, 1);
}

#[tokio::test]
async fn test_empty_pantry_reply() {
    let server = MockServer::start().await;
    mount_inventory(&server, json!([])).await;

    let machine = front_door(&server, AgentResult::fail("unused"));
    let reply = machine.process_message("show inventory", 1, "a@example.com").await;

    assert!(reply.contains("pantry is empty"), "reply: {reply}");
}

#[tokio::test]
async fn test_crud_gate_low_stock_report() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([
            {"name": "Milk", "totalQuantity": 1.0, "unitName": "l"},
            {"name": "Rice", "totalQuantity": 5.0, "unitName": "kg"}
        ]),
    )
    .await;

    let machine = front_door(&server, AgentResult::fail("intent agent must not run"));
    let reply = machine
        .process_message("we are running low on stuff", 1, "a@example.com")
        .await;

    assert!(reply.contains("1 items running low"), "reply: {reply}");
    assert!(reply.contains("Milk - only 1 l left"), "reply: {reply}");
    assert_eq!(machine.stats().early_exits, 1);
}

#[tokio::test]
async fn test_classified_expiring_intent_hits_backend_directly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getExpiring"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Yogurt", "totalQuantity": 1.0, "unitName": "cup", "expiryDate": "2026-08-07"}
        ])))
        .mount(&server)
        .await;

    let machine = front_door(
        &server,
        AgentResult::ok(json!({"intent": "inventory_expiring", "confidence": 0.9}), 0.9),
    );
    let reply = machine
        .process_message("anything going bad in there", 1, "a@example.com")
        .await;

    assert!(reply.contains("1 items expiring soon"), "reply: {reply}");
    assert!(reply.contains("Yogurt - expires 2026-08-07"), "reply: {reply}");

    let stats = machine.stats();
    assert_eq!(stats.llm_calls, 1);
    assert_eq!(stats.backend_direct, 1);
}

#[tokio::test]
async fn test_classified_shopping_list_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/shopping/getLists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"itemName": "Eggs", "quantity": 12.0},
            {"itemName": "Butter", "quantity": 1.0}
        ])))
        .mount(&server)
        .await;

    let machine = front_door(
        &server,
        AgentResult::ok(json!({"intent": "shopping_list", "confidence": 0.8}), 0.8),
    );
    let reply = machine
        .process_message("groceries outstanding for tomorrow", 1, "a@example.com")
        .await;

    assert!(reply.contains("shopping list (2 items)"), "reply: {reply}");
    assert!(reply.contains("Eggs - 12"), "reply: {reply}");
}

#[tokio::test]
async fn test_low_confidence_falls_back_to_full_loop() {
    let server = MockServer::start().await;

    // Confidence 0.4: the front door defers to the governed loop, which
    // rejects the unclear intent with the clarification template.
    let machine = front_door(
        &server,
        AgentResult::ok(json!({"intent": "inventory_list", "confidence": 0.4}), 0.4),
    );
    let reply = machine
        .process_message("mrrgl bzzt unknowable", 1, "a@example.com")
        .await;

    assert!(reply.contains("more specific"), "reply: {reply}");
    assert_eq!(machine.stats().llm_calls, 1);
}

#[tokio::test]
async fn test_backend_outage_degrades_gracefully() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getAll"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let machine = front_door(&server, AgentResult::fail("unused"));
    let reply = machine.process_message("show inventory", 1, "a@example.com").await;

    assert!(
        reply.contains("couldn't fetch your inventory"),
        "reply: {reply}"
    );
}

#[tokio::test]
async fn test_category_filtering() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([
            {"name": "Carrots", "totalQuantity": 3.0, "unitName": "kg", "categoryName": "Vegetables"},
            {"name": "Milk", "totalQuantity": 2.0, "unitName": "l", "categoryName": "Dairy"}
        ]),
    )
    .await;

    let machine = front_door(
        &server,
        AgentResult::ok(
            json!({"intent": "inventory_category", "confidence": 0.9, "category": "vegetables"}),
            0.9,
        ),
    );
    let reply = machine
        .process_message("whats fresh in the veggie drawer", 1, "a@example.com")
        .await;

    assert!(reply.contains("1 vegetables in stock"), "reply: {reply}");
    assert!(reply.contains("Carrots"), "reply: {reply}");
    assert!(!reply.contains("Milk"), "reply: {reply}");
}
