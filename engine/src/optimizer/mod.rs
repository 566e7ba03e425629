//! Cost optimizer
//!
//! Zero-call exit gates that can resolve a request before any generation
//! backend is touched, plus the process-wide intent cache. Four gates are
//! checked in fixed order and the first match wins:
//!
//! 1. **Rule-based**: exact lookup of the normalized utterance in a canned
//!    table
//! 2. **Cached intent**: content-addressed lookup of a previously classified
//!    utterance
//! 3. **Simple CRUD**: ordered per-intent regex patterns
//! 4. **Deterministic fallback**: keyword containment and fuzzy per-word
//!    similarity
//!
//! All gate tables are plain data and can be overridden from configuration.
//! The intent cache is injected behind a small store trait so the gates stay
//! storage-agnostic.

use regex::Regex;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use similar::TextDiff;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::config::LlmConfig;

/// Literal substring containment score in the deterministic gate
const CONTAINMENT_SCORE: f64 = 0.8;

/// Minimum per-word similarity for a fuzzy keyword hit
const WORD_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Minimum best score for the deterministic gate to accept
const ACCEPT_THRESHOLD: f64 = 0.7;

/// Fixed confidence reported by the simple CRUD gate
const CRUD_CONFIDENCE: f64 = 0.95;

/// Which exit gate resolved a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitGate {
    RuleBased,
    CachedIntent,
    SimpleCrud,
    HighConfidence,
    Deterministic,
}

impl ExitGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule_based",
            Self::CachedIntent => "cached_intent",
            Self::SimpleCrud => "simple_crud",
            Self::HighConfidence => "high_confidence",
            Self::Deterministic => "deterministic",
        }
    }
}

impl fmt::Display for ExitGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direct action attached to a gate result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitAction {
    ListInventory,
    AddItem,
    CheckItem,
}

/// A request resolved by an exit gate
#[derive(Debug, Clone)]
pub struct EarlyExit {
    /// Gate that matched
    pub gate: ExitGate,

    /// Classified intent
    pub intent: String,

    /// Classification confidence
    pub confidence: f64,

    /// Canned response text, when the gate can answer directly
    pub response: Option<String>,

    /// Direct action, when the gate maps to a backend operation
    pub action: Option<ExitAction>,

    /// Quantity extracted from the utterance (inventory_add only)
    pub quantity: Option<i64>,
}

/// Cached intent classification
///
/// Created on first successful classification, immutable thereafter, and
/// retained for the process lifetime. Entries are content-addressed, so
/// re-caching the same utterance is an idempotent upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedIntent {
    pub intent: String,
    pub confidence: f64,
    pub cached: bool,
}

/// Store interface for the intent cache
///
/// Injected so the optimizer stays storage-agnostic: an in-memory map and an
/// external cache are both valid implementations. Last-write-wins semantics
/// suffice.
pub trait IntentCache: Send + Sync {
    /// Look up an entry by content hash
    fn get(&self, key: &str) -> Option<CachedIntent>;

    /// Insert or overwrite an entry
    fn put(&self, key: String, entry: CachedIntent);

    /// Number of cached entries
    fn len(&self) -> usize;

    /// Whether the cache is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory intent cache
#[derive(Default)]
pub struct InMemoryIntentCache {
    entries: RwLock<HashMap<String, CachedIntent>>,
}

impl InMemoryIntentCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntentCache for InMemoryIntentCache {
    fn get(&self, key: &str) -> Option<CachedIntent> {
        let entries = self.entries.read().expect("intent cache lock poisoned");
        entries.get(key).cloned()
    }

    fn put(&self, key: String, entry: CachedIntent) {
        let mut entries = self.entries.write().expect("intent cache lock poisoned");
        entries.insert(key, entry);
    }

    fn len(&self) -> usize {
        let entries = self.entries.read().expect("intent cache lock poisoned");
        entries.len()
    }
}

/// Task category for model-tier selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    IntentClassification,
    SimpleResponse,
    Planning,
    ComplexReasoning,
}

/// One canned utterance in the rule-based table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactMatchRule {
    pub utterance: String,
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ExitAction>,
}

/// Ordered regex patterns for one intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPatterns {
    pub intent: String,
    pub patterns: Vec<String>,
}

/// Ordered keywords for one intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentKeywords {
    pub intent: String,
    pub keywords: Vec<String>,
}

/// Cost optimizer tables, externally editable
///
/// Order is significant for `crud_patterns` and `intent_keywords`: earlier
/// entries win ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_exact_matches")]
    pub exact_matches: Vec<ExactMatchRule>,

    #[serde(default = "default_crud_patterns")]
    pub crud_patterns: Vec<IntentPatterns>,

    #[serde(default = "default_intent_keywords")]
    pub intent_keywords: Vec<IntentKeywords>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            exact_matches: default_exact_matches(),
            crud_patterns: default_crud_patterns(),
            intent_keywords: default_intent_keywords(),
        }
    }
}

impl OptimizerConfig {
    /// Check that every configured pattern compiles
    pub fn validate(&self) -> Result<(), EngineError> {
        for group in &self.crud_patterns {
            for pattern in &group.patterns {
                Regex::new(pattern).map_err(|e| {
                    EngineError::Config(format!(
                        "Invalid pattern '{pattern}' for intent '{}': {e}",
                        group.intent
                    ))
                })?;
            }
        }
        Ok(())
    }
}

fn default_exact_matches() -> Vec<ExactMatchRule> {
    vec![
        ExactMatchRule {
            utterance: "hello".to_string(),
            intent: "greeting".to_string(),
            response: Some(
                "Hello! 👋 I'm your Larder assistant. What can I help you with?".to_string(),
            ),
            action: None,
        },
        ExactMatchRule {
            utterance: "hi".to_string(),
            intent: "greeting".to_string(),
            response: Some("Hi there! How can I help you manage your pantry today?".to_string()),
            action: None,
        },
        ExactMatchRule {
            utterance: "help".to_string(),
            intent: "help".to_string(),
            response: Some(
                "I can help you manage inventory, find recipes, process receipts, and analyze your pantry data."
                    .to_string(),
            ),
            action: None,
        },
        ExactMatchRule {
            utterance: "inventory".to_string(),
            intent: "inventory_list".to_string(),
            response: None,
            action: Some(ExitAction::ListInventory),
        },
        ExactMatchRule {
            utterance: "show inventory".to_string(),
            intent: "inventory_list".to_string(),
            response: None,
            action: Some(ExitAction::ListInventory),
        },
        ExactMatchRule {
            utterance: "list items".to_string(),
            intent: "inventory_list".to_string(),
            response: None,
            action: Some(ExitAction::ListInventory),
        },
    ]
}

fn default_crud_patterns() -> Vec<IntentPatterns> {
    let table: &[(&str, &[&str])] = &[
        (
            "inventory_list",
            &[
                r"inventory.*items",
                r"what.*inventory",
                r"show.*inventory",
                r"list.*items",
            ],
        ),
        (
            "inventory_expiring",
            &[
                r"expiring.*soon",
                r"items.*expiring",
                r"expired.*items",
                r"all.*expired",
            ],
        ),
        (
            "inventory_low_stock",
            &[r"low.*stock", r"running.*low", r"almost.*empty"],
        ),
        (
            "inventory_check",
            &[r".*i have", r"check.*", r"how much.*", r"do.*have"],
        ),
        ("inventory_add", &[r"add \d+.*", r"put.*in.*pantry"]),
        ("greeting", &[r"^(hi|hello|hey)$"]),
        ("help", &[r"help", r"what.*can.*do"]),
    ];

    table
        .iter()
        .map(|(intent, patterns)| IntentPatterns {
            intent: intent.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
}

fn default_intent_keywords() -> Vec<IntentKeywords> {
    let table: &[(&str, &[&str])] = &[
        ("inventory_add", &["add", "put", "store", "insert", "include"]),
        ("inventory_list", &["show", "list", "display", "view", "see"]),
        ("inventory_check", &["have", "check", "find", "search", "look"]),
        ("shopping_list", &["shopping", "buy", "purchase", "need", "list"]),
        ("recipe", &["cook", "make", "recipe", "prepare", "dish"]),
        ("help", &["help", "assist", "guide", "support"]),
    ];

    table
        .iter()
        .map(|(intent, keywords)| IntentKeywords {
            intent: intent.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// The cost optimizer
pub struct CostOptimizer {
    exact_matches: HashMap<String, ExactMatchRule>,
    crud_patterns: Vec<(String, Vec<Regex>)>,
    intent_keywords: Vec<(String, Vec<String>)>,
    quantity_pattern: Regex,
    cache: Arc<dyn IntentCache>,
    fast_model: String,
    smart_model: String,
}

impl CostOptimizer {
    /// Build the optimizer, compiling every configured pattern once
    pub fn new(
        config: &OptimizerConfig,
        llm: &LlmConfig,
        cache: Arc<dyn IntentCache>,
    ) -> Result<Self, EngineError> {
        let mut exact_matches = HashMap::new();
        for rule in &config.exact_matches {
            exact_matches.insert(rule.utterance.trim().to_lowercase(), rule.clone());
        }

        let mut crud_patterns = Vec::with_capacity(config.crud_patterns.len());
        for group in &config.crud_patterns {
            let mut compiled = Vec::with_capacity(group.patterns.len());
            for pattern in &group.patterns {
                let regex = Regex::new(pattern).map_err(|e| {
                    EngineError::Config(format!(
                        "Invalid pattern '{pattern}' for intent '{}': {e}",
                        group.intent
                    ))
                })?;
                compiled.push(regex);
            }
            crud_patterns.push((group.intent.clone(), compiled));
        }

        let intent_keywords = config
            .intent_keywords
            .iter()
            .map(|group| (group.intent.clone(), group.keywords.clone()))
            .collect();

        let quantity_pattern =
            Regex::new(r"add (\d+)").map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Self {
            exact_matches,
            crud_patterns,
            intent_keywords,
            quantity_pattern,
            cache,
            fast_model: llm.fast_model.clone(),
            smart_model: llm.smart_model.clone(),
        })
    }

    /// Check whether the request can be resolved without any backend call
    ///
    /// Gates are checked in fixed order and the first match wins; later gates
    /// are never evaluated once one has matched.
    pub fn should_exit_early(&self, message: &str) -> Option<EarlyExit> {
        let normalized = message.trim().to_lowercase();

        if let Some(exit) = self.check_rule_based(&normalized) {
            debug!("Early exit via {} for '{}'", exit.gate, normalized);
            return Some(exit);
        }

        if let Some(exit) = self.check_cached_intent(&normalized) {
            debug!("Early exit via {} for '{}'", exit.gate, normalized);
            return Some(exit);
        }

        if let Some(exit) = self.check_simple_crud(&normalized) {
            debug!("Early exit via {} for '{}'", exit.gate, normalized);
            return Some(exit);
        }

        if let Some(exit) = self.check_similarity(&normalized) {
            debug!("Early exit via {} for '{}'", exit.gate, normalized);
            return Some(exit);
        }

        None
    }

    /// Gate 1: exact lookup in the canned-utterance table
    fn check_rule_based(&self, normalized: &str) -> Option<EarlyExit> {
        let rule = self.exact_matches.get(normalized)?;
        Some(EarlyExit {
            gate: ExitGate::RuleBased,
            intent: rule.intent.clone(),
            confidence: 1.0,
            response: rule.response.clone(),
            action: rule.action,
            quantity: None,
        })
    }

    /// Gate 2: content-addressed lookup of a previous classification
    fn check_cached_intent(&self, normalized: &str) -> Option<EarlyExit> {
        let cached = self.cache.get(&message_key(normalized))?;
        Some(EarlyExit {
            gate: ExitGate::CachedIntent,
            intent: cached.intent,
            confidence: cached.confidence,
            response: None,
            action: None,
            quantity: None,
        })
    }

    /// Gate 3: ordered per-intent regex patterns
    fn check_simple_crud(&self, normalized: &str) -> Option<EarlyExit> {
        for (intent, patterns) in &self.crud_patterns {
            for pattern in patterns {
                if pattern.is_match(normalized) {
                    let mut exit = EarlyExit {
                        gate: ExitGate::SimpleCrud,
                        intent: intent.clone(),
                        confidence: CRUD_CONFIDENCE,
                        response: None,
                        action: None,
                        quantity: None,
                    };

                    match intent.as_str() {
                        "inventory_add" => {
                            if let Some(captures) = self.quantity_pattern.captures(normalized) {
                                exit.quantity =
                                    captures.get(1).and_then(|m| m.as_str().parse().ok());
                                exit.action = Some(ExitAction::AddItem);
                            }
                        }
                        "inventory_list" => exit.action = Some(ExitAction::ListInventory),
                        "inventory_check" => exit.action = Some(ExitAction::CheckItem),
                        _ => {}
                    }

                    return Some(exit);
                }
            }
        }
        None
    }

    /// Gate 4: keyword containment plus fuzzy per-word similarity
    ///
    /// Tables are walked in fixed order and the best match is only overwritten
    /// by a strictly greater score, so ties resolve to the earlier intent.
    fn check_similarity(&self, normalized: &str) -> Option<EarlyExit> {
        let words: Vec<&str> = normalized.split_whitespace().collect();

        let mut best_intent: Option<&str> = None;
        let mut best_score = 0.0f64;

        for (intent, keywords) in &self.intent_keywords {
            for keyword in keywords {
                let score = if normalized.contains(keyword.as_str()) {
                    CONTAINMENT_SCORE
                } else {
                    let mut word_score = None;
                    for word in &words {
                        let ratio =
                            TextDiff::from_chars(keyword.as_str(), *word).ratio() as f64;
                        if ratio > WORD_SIMILARITY_THRESHOLD {
                            word_score = Some(ratio);
                            break;
                        }
                    }
                    match word_score {
                        Some(score) => score,
                        None => continue,
                    }
                };

                if score > best_score {
                    best_score = score;
                    best_intent = Some(intent);
                }
            }
        }

        let intent = best_intent?;
        if best_score > ACCEPT_THRESHOLD {
            Some(EarlyExit {
                gate: ExitGate::Deterministic,
                intent: intent.to_string(),
                confidence: best_score,
                response: None,
                action: None,
                quantity: None,
            })
        } else {
            None
        }
    }

    /// Cache a successful intent classification
    ///
    /// Keys are content hashes of the normalized message, so repeated calls
    /// with the same utterance upsert a single entry.
    pub fn cache_intent(&self, message: &str, intent: &str, confidence: f64) {
        let key = message_key(&message.trim().to_lowercase());
        self.cache.put(
            key,
            CachedIntent {
                intent: intent.to_string(),
                confidence,
                cached: true,
            },
        );
    }

    /// Number of cached intents (observability only)
    pub fn cached_intents(&self) -> usize {
        self.cache.len()
    }

    /// Decide whether the validation pass can be skipped
    pub fn should_skip_validation(&self, confidence: f64, data_type: &str) -> bool {
        // High confidence + structured data
        if confidence > 0.9 && matches!(data_type, "inventory_crud" | "simple_query") {
            return true;
        }

        // Known safe read operations
        let lowered = data_type.to_lowercase();
        ["list", "get", "check"]
            .iter()
            .any(|op| lowered.contains(op))
    }

    /// Cheapest model tier capable of the given task
    pub fn minimal_model_for(&self, task: TaskKind) -> &str {
        match task {
            TaskKind::IntentClassification | TaskKind::SimpleResponse => &self.fast_model,
            TaskKind::Planning | TaskKind::ComplexReasoning => &self.smart_model,
        }
    }
}

/// Content hash used as intent-cache key
fn message_key(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
