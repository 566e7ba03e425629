//! Optimized Driver
//!
//! Cost-aware front door over the governed state machine. Requests run
//! through the zero-call exit gates first; whatever they cannot resolve gets
//! a single intent classification and, when confident, a direct dispatch to
//! the kitchen backend, bypassing governor and validator. Only the recipe
//! intent and low-confidence classifications fall back to the full loop.
//!
//! The request counters are observability only; nothing in the control flow
//! reads them back.

use sdk::agent::AgentInput;
use sdk::errors::EngineError;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{InventoryItem, KitchenBackend};
use crate::config::Config;
use crate::governor::Governor;
use crate::history::ConversationHistory;
use crate::llm::{ChatModel, OpenRouterClient};
use crate::optimizer::{
    CostOptimizer, EarlyExit, ExitAction, InMemoryIntentCache, IntentCache, TaskKind,
};

use super::machine::{AgentSet, StateMachine};

/// Canned greeting used by the zero-call paths
const GREETING_REPLY: &str = "Hello! 👋 I'm your Larder assistant. What can I help you with?";

/// Canned help overview
const HELP_REPLY: &str = "I can help you with:\n\
• Check inventory - \"show my items\"\n\
• Add items - \"add 2 milk\"\n\
• Find recipes - \"what can I cook?\"\n\
• Process receipts - \"scan my receipt\"\n\
• View stats - \"show pantry stats\"";

/// Guidance when an add request lacks detail
const ADD_ITEM_REPLY: &str = "I can help you add items to your inventory. Please specify the \
item name, quantity, and unit (e.g., '2 kg tomatoes').";

/// Guidance when a consume request lacks detail
const CONSUME_REPLY: &str = "I can help you update inventory after consumption. Please specify \
the item and quantity consumed (e.g., 'consumed 200g rice').";

/// Guidance when a check request lacks an item
const CHECK_ITEM_REPLY: &str = "What item would you like me to check in your inventory?";

/// Observability counters for the front door
#[derive(Default)]
struct RequestStats {
    llm_calls: AtomicU64,
    early_exits: AtomicU64,
    backend_direct: AtomicU64,
}

/// Point-in-time view of the request counters
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub llm_calls: u64,
    pub early_exits: u64,
    pub backend_direct: u64,
    pub cost_savings_pct: f64,
}

/// Cost-optimized front door over the governed state machine
pub struct OptimizedStateMachine {
    inner: StateMachine,
    optimizer: CostOptimizer,
    backend: Arc<KitchenBackend>,
    history: ConversationHistory,
    stats: RequestStats,
}

impl OptimizedStateMachine {
    /// Assemble the front door from already-built parts
    pub fn new(
        inner: StateMachine,
        optimizer: CostOptimizer,
        backend: Arc<KitchenBackend>,
        history: ConversationHistory,
    ) -> Self {
        Self {
            inner,
            optimizer,
            backend,
            history,
            stats: RequestStats::default(),
        }
    }

    /// Wire the full engine from configuration
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        config.validate()?;

        let backend = Arc::new(KitchenBackend::new(&config.backend));
        let model: Arc<dyn ChatModel> = Arc::new(OpenRouterClient::new(config.llm.clone()));
        let cache: Arc<dyn IntentCache> = Arc::new(InMemoryIntentCache::new());
        let optimizer = CostOptimizer::new(&config.optimizer, &config.llm, cache)?;

        let fast_model = optimizer
            .minimal_model_for(TaskKind::IntentClassification)
            .to_string();
        let smart_model = optimizer
            .minimal_model_for(TaskKind::ComplexReasoning)
            .to_string();

        let agents = AgentSet {
            intent: Arc::new(crate::agents::IntentAgent::new(model.clone(), fast_model)),
            planner: Arc::new(crate::agents::PlannerAgent::new()),
            inventory: Arc::new(crate::agents::InventoryAgent::new(backend.clone())),
            ocr: Arc::new(crate::agents::OcrAgent::new(backend.clone())),
            recipe: Arc::new(crate::agents::RecipeAgent::new(
                backend.clone(),
                model,
                smart_model,
            )),
            validator: Arc::new(crate::agents::ValidatorAgent::new()),
            responder: Arc::new(crate::agents::ResponderAgent::new()),
        };

        let inner = StateMachine::new(Governor::new(config.governor.clone()), agents);
        Ok(Self::new(
            inner,
            optimizer,
            backend,
            ConversationHistory::new(),
        ))
    }

    /// Access the wrapped governed state machine
    pub fn inner(&self) -> &StateMachine {
        &self.inner
    }

    /// Access the cost optimizer
    pub fn optimizer(&self) -> &CostOptimizer {
        &self.optimizer
    }

    /// Access the conversation history
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Sole public entrypoint: process one user message
    pub async fn process_message(
        &self,
        message: &str,
        kitchen_id: i64,
        user_email: &str,
    ) -> String {
        let reply = self.dispatch(message, kitchen_id, user_email).await;
        self.history.record(user_email, message, &reply);
        reply
    }

    async fn dispatch(&self, message: &str, kitchen_id: i64, user_email: &str) -> String {
        let normalized = message.trim().to_lowercase();

        // Narrow direct-answer path: exact greetings cost nothing
        if matches!(normalized.as_str(), "hello" | "hi" | "hey") {
            self.stats.early_exits.fetch_add(1, Ordering::Relaxed);
            return GREETING_REPLY.to_string();
        }

        // Zero-call exit gates
        if let Some(exit) = self.optimizer.should_exit_early(message) {
            self.stats.early_exits.fetch_add(1, Ordering::Relaxed);
            info!("Early exit via {} gate (intent {})", exit.gate, exit.intent);
            return self
                .handle_early_exit(&exit, message, kitchen_id, user_email)
                .await;
        }

        // Single-shot classification, then direct action
        self.stats.llm_calls.fetch_add(1, Ordering::Relaxed);
        self.classify_and_dispatch(message, kitchen_id, user_email)
            .await
    }

    /// Resolve a request matched by an exit gate
    async fn handle_early_exit(
        &self,
        exit: &EarlyExit,
        message: &str,
        kitchen_id: i64,
        user_email: &str,
    ) -> String {
        // Direct response available
        if let Some(response) = &exit.response {
            return response.clone();
        }

        // Direct action needed
        if let Some(action) = exit.action {
            return match action {
                ExitAction::ListInventory => self.inventory_reply(kitchen_id).await,
                ExitAction::AddItem => ADD_ITEM_REPLY.to_string(),
                ExitAction::CheckItem => CHECK_ITEM_REPLY.to_string(),
            };
        }

        // The gate classified without resolving: dispatch on its intent
        self.direct_action(&exit.intent, None, message, kitchen_id, user_email)
            .await
    }

    /// Classify with one model call, then dispatch directly
    async fn classify_and_dispatch(
        &self,
        message: &str,
        kitchen_id: i64,
        user_email: &str,
    ) -> String {
        let input = AgentInput::new("classify").with_param("message", json!(message));
        let result = self.inner.agents().intent.execute(input).await;

        if !result.success {
            return "I'm having trouble understanding your request. Could you rephrase it?"
                .to_string();
        }

        let Some(intent) = result.data_str("intent").map(str::to_string) else {
            return "I'm not sure what you're asking for. Could you please rephrase your request?"
                .to_string();
        };
        let confidence = result.data_f64("confidence").unwrap_or(0.0);
        let category = result.data_str("category").map(str::to_string);

        debug!("Classified '{}' as {} ({:.2})", message, intent, confidence);

        // Cache the successful classification for the cached-intent gate
        self.optimizer.cache_intent(message, &intent, confidence);

        if confidence > 0.5 {
            self.direct_action(&intent, category.as_deref(), message, kitchen_id, user_email)
                .await
        } else {
            // Low confidence: the full governed loop takes over
            self.inner.process_message(message, kitchen_id, user_email).await
        }
    }

    /// Dispatch a classified intent without planning
    async fn direct_action(
        &self,
        intent: &str,
        category: Option<&str>,
        message: &str,
        kitchen_id: i64,
        user_email: &str,
    ) -> String {
        match intent {
            "inventory" | "inventory_list" | "inventory_check" => {
                self.inventory_reply(kitchen_id).await
            }
            "inventory_category" => self.category_reply(message, kitchen_id, category).await,
            "inventory_consume" => CONSUME_REPLY.to_string(),
            "inventory_expiring" => self.expiring_reply(kitchen_id).await,
            "inventory_low_stock" => self.low_stock_reply(kitchen_id).await,
            "shopping_list" => self.shopping_reply(kitchen_id).await,
            "inventory_add" => ADD_ITEM_REPLY.to_string(),
            "greeting" => GREETING_REPLY.to_string(),
            "help" => HELP_REPLY.to_string(),
            // Recipes need planning, execution, and validation
            "recipe" => {
                self.inner
                    .process_message(message, kitchen_id, user_email)
                    .await
            }
            _ => "I can help you with that. Could you be more specific?".to_string(),
        }
    }

    /// List inventory without any model call
    async fn inventory_reply(&self, kitchen_id: i64) -> String {
        match self.backend.get_inventory(kitchen_id).await {
            Ok(inventory) => {
                self.stats.backend_direct.fetch_add(1, Ordering::Relaxed);

                if inventory.is_empty() {
                    return "Your pantry is empty. Start by adding some items!".to_string();
                }

                let in_stock: Vec<&InventoryItem> = inventory
                    .iter()
                    .filter(|item| item.total_quantity > 0.0)
                    .collect();

                if in_stock.is_empty() {
                    return "Your pantry appears to be empty or all items are out of stock. \
                            Time to go shopping! 🛒"
                        .to_string();
                }

                let mut reply = format!("You have {} items in stock:\n\n", in_stock.len());
                for item in in_stock.iter().take(10) {
                    reply.push_str(&format!(
                        "• {} - {} {}\n",
                        item.name, item.total_quantity, item.unit_name
                    ));
                }
                if in_stock.len() > 10 {
                    reply.push_str(&format!(
                        "\n... and {} more items in stock.",
                        in_stock.len() - 10
                    ));
                }

                let out_of_stock = inventory.len() - in_stock.len();
                if out_of_stock > 0 {
                    reply.push_str(&format!("\n\n⚠️ {out_of_stock} items are out of stock."));
                }

                reply
            }
            Err(e) => {
                warn!("Direct inventory fetch failed: {}", e);
                "I couldn't fetch your inventory right now. Please try again.".to_string()
            }
        }
    }

    /// List items expiring soon
    async fn expiring_reply(&self, kitchen_id: i64) -> String {
        match self.backend.get_expiring(kitchen_id).await {
            Ok(expiring) => {
                self.stats.backend_direct.fetch_add(1, Ordering::Relaxed);

                if expiring.is_empty() {
                    return "Great news! No items are expiring soon in your pantry.".to_string();
                }

                let mut reply = format!("⚠️ You have {} items expiring soon:\n\n", expiring.len());
                for item in expiring.iter().take(10) {
                    let expiry = item.expiry_date.as_deref().unwrap_or("unknown");
                    reply.push_str(&format!("• {} - expires {}\n", item.name, expiry));
                }
                reply
            }
            Err(e) => {
                warn!("Expiring items fetch failed: {}", e);
                "I couldn't check expiring items right now. Please try again.".to_string()
            }
        }
    }

    /// List items running low
    async fn low_stock_reply(&self, kitchen_id: i64) -> String {
        match self.backend.get_inventory(kitchen_id).await {
            Ok(inventory) => {
                self.stats.backend_direct.fetch_add(1, Ordering::Relaxed);

                let low_stock: Vec<&InventoryItem> = inventory
                    .iter()
                    .filter(|item| item.total_quantity <= 2.0)
                    .collect();

                if low_stock.is_empty() {
                    return "All items are well stocked! 📦".to_string();
                }

                let mut reply =
                    format!("📉 You have {} items running low:\n\n", low_stock.len());
                for item in low_stock.iter().take(10) {
                    reply.push_str(&format!(
                        "• {} - only {} {} left\n",
                        item.name, item.total_quantity, item.unit_name
                    ));
                }
                reply
            }
            Err(e) => {
                warn!("Low stock fetch failed: {}", e);
                "I couldn't check low stock items right now. Please try again.".to_string()
            }
        }
    }

    /// Show the shopping list
    async fn shopping_reply(&self, kitchen_id: i64) -> String {
        match self.backend.get_shopping_lists(kitchen_id).await {
            Ok(items) => {
                self.stats.backend_direct.fetch_add(1, Ordering::Relaxed);

                if items.is_empty() {
                    return "Your shopping list is empty. Add items you need to buy!".to_string();
                }

                let mut reply = format!("🛒 Your shopping list ({} items):\n\n", items.len());
                for item in items.iter().take(10) {
                    reply.push_str(&format!("• {} - {}\n", item.item_name, item.quantity));
                }
                reply
            }
            Err(e) => {
                warn!("Shopping list fetch failed: {}", e);
                "I couldn't fetch your shopping list right now. Please try again.".to_string()
            }
        }
    }

    /// List inventory filtered by category
    async fn category_reply(
        &self,
        message: &str,
        kitchen_id: i64,
        category_hint: Option<&str>,
    ) -> String {
        match self.backend.get_inventory(kitchen_id).await {
            Ok(inventory) => {
                self.stats.backend_direct.fetch_add(1, Ordering::Relaxed);

                let target = category_hint
                    .and_then(canonical_category)
                    .or_else(|| sniff_category(message));

                let filtered: Vec<&InventoryItem> = inventory
                    .iter()
                    .filter(|item| item.total_quantity > 0.0)
                    .filter(|item| {
                        target
                            .map(|category| item.category_name == category)
                            .unwrap_or(true)
                    })
                    .collect();

                let label = target.map(str::to_lowercase).unwrap_or_else(|| "items".to_string());
                if filtered.is_empty() {
                    return format!("No {label} found in your pantry.");
                }

                let mut reply = format!("You have {} {} in stock:\n\n", filtered.len(), label);
                for item in filtered.iter().take(10) {
                    reply.push_str(&format!(
                        "• {} - {} {}\n",
                        item.name, item.total_quantity, item.unit_name
                    ));
                }
                reply
            }
            Err(e) => {
                warn!("Category inventory fetch failed: {}", e);
                "I couldn't fetch the category inventory right now. Please try again.".to_string()
            }
        }
    }

    /// Current counter values
    pub fn stats(&self) -> StatsSnapshot {
        let llm_calls = self.stats.llm_calls.load(Ordering::Relaxed);
        let early_exits = self.stats.early_exits.load(Ordering::Relaxed);
        let backend_direct = self.stats.backend_direct.load(Ordering::Relaxed);
        let total_requests = llm_calls + early_exits;

        let cost_savings_pct = if total_requests == 0 {
            0.0
        } else {
            (early_exits as f64 / total_requests as f64) * 100.0
        };

        StatsSnapshot {
            total_requests,
            llm_calls,
            early_exits,
            backend_direct,
            cost_savings_pct,
        }
    }
}

/// Map a category hint from the classifier to the backend's category name
fn canonical_category(hint: &str) -> Option<&'static str> {
    match hint.to_lowercase().as_str() {
        "vegetables" => Some("Vegetables"),
        "fruits" => Some("Fruits"),
        "dairy" => Some("Dairy"),
        "meat" => Some("Meat"),
        "grains" => Some("Grains"),
        _ => None,
    }
}

/// Fall back to sniffing the category from the message itself
fn sniff_category(message: &str) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    for key in ["vegetables", "fruits", "dairy", "meat", "grains"] {
        if lowered.contains(key) {
            return canonical_category(key);
        }
    }
    None
}
