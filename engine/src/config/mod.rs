//! Configuration management
//!
//! This module handles loading, validation, and management of the Larder
//! configuration. Configuration is stored in TOML format at
//! ~/.larder/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, default kitchen and user for the CLI
//! - **llm**: Chat model endpoint, model tiers, timeout
//! - **backend**: Kitchen backend endpoint and timeout
//! - **governor**: Routing policy thresholds and flags
//! - **optimizer**: Exit-gate tables (exact matches, patterns, keywords)
//!
//! The governor rules and optimizer tables are plain data: they can be
//! overridden from the file without any code change.

use crate::governor::GovernorRules;
use crate::optimizer::OptimizerConfig;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section has complete defaults, so an empty file (or no file at all)
/// yields a working local configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Chat model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Kitchen backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Governor policy rules
    #[serde(default)]
    pub governor: GovernorRules,

    /// Cost optimizer tables
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Kitchen used when the CLI does not specify one
    #[serde(default = "default_kitchen_id")]
    pub default_kitchen_id: i64,

    /// User email used when the CLI does not specify one
    #[serde(default = "default_user_email")]
    pub default_user_email: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_kitchen_id: default_kitchen_id(),
            default_user_email: default_user_email(),
        }
    }
}

/// Chat model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key; falls back to the OPENROUTER_API_KEY environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Cheapest model tier, used for classification and simple responses
    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    /// Larger model tier, used for planning and recipe suggestions
    #[serde(default = "default_smart_model")]
    pub smart_model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            fast_model: default_fast_model(),
            smart_model: default_smart_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
    }
}

/// Kitchen backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the kitchen backend
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_kitchen_id() -> i64 {
    1
}

fn default_user_email() -> String {
    "guest@example.com".to_string()
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_fast_model() -> String {
    "qwen/qwen-2.5-7b-instruct".to_string()
}

fn default_smart_model() -> String {
    "qwen/qwen-2.5-14b-instruct".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_backend_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Default configuration file location (~/.larder/config.toml)
    pub fn default_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".larder").join("config.toml"))
    }

    /// Load configuration from the default location, creating a default file
    /// if none exists yet.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let path = Self::default_path()?;
        if path.exists() {
            return Self::load_from_path(&path);
        }

        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to render default config: {e}")))?;
        fs::write(&path, rendered)?;
        tracing::info!("Created default configuration at {}", path.display());

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> Result<(), EngineError> {
        let rules = &self.governor;
        if !(0.0..=1.0).contains(&rules.ocr_confidence_threshold) {
            return Err(EngineError::Config(
                "governor.ocr_confidence_threshold must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&rules.require_intent_confidence) {
            return Err(EngineError::Config(
                "governor.require_intent_confidence must be within [0, 1]".to_string(),
            ));
        }
        if rules.max_plan_steps == 0 {
            return Err(EngineError::Config(
                "governor.max_plan_steps must be at least 1".to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        self.optimizer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.core.default_kitchen_id, 1);
        assert_eq!(config.backend.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.governor.max_plan_steps, 5);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.backend.timeout_secs, 10);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
[governor]
max_plan_steps = 3

[backend]
base_url = "http://kitchen.internal:9090"
"#,
        )
        .unwrap();

        assert_eq!(config.governor.max_plan_steps, 3);
        assert_eq!(config.backend.base_url, "http://kitchen.internal:9090");
        // Untouched sections keep their defaults
        assert_eq!(config.governor.require_intent_confidence, 0.7);
        assert_eq!(config.backend.timeout_secs, 10);
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(
            parsed.governor.ocr_confidence_threshold,
            config.governor.ocr_confidence_threshold
        );
        assert_eq!(parsed.llm.fast_model, config.llm.fast_model);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config: Config = toml::from_str(
            r#"
[governor]
require_intent_confidence = 1.5
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_plan_steps_rejected() {
        let config: Config = toml::from_str(
            r#"
[governor]
max_plan_steps = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[core]
log_level = "debug"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.core.log_level, "debug");
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::load_from_path(&path).is_err());
    }
}
