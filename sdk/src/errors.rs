//! Error types and handling
//!
//! This module provides the error types used throughout the Larder engine.
//! All errors implement the `AssistantErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All error messages are scrubbed to ensure:
//! - No secrets (API keys, tokens) are included
//! - No internal field names or backtraces reach end users
//! - All hints are safe to display verbatim

use thiserror::Error;

/// Trait for Larder error extensions
///
/// Provides additional context for errors, including user-friendly hints and
/// recoverability information. All engine errors implement this trait.
pub trait AssistantErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens, passwords)
    /// - Internal identifiers or implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around by rephrasing the
    /// request. Non-recoverable errors typically require operator attention.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// Represents all failure classes the orchestration core can encounter. The
/// first group mirrors the driver's failure taxonomy (precondition rejection,
/// agent failure, validation failure, plan complexity, unclear intent); the
/// rest cover the ambient concerns (configuration, collaborator transport).
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Kitchen backend errors
    #[error("Backend error: {0}")]
    Backend(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("LLM call timed out")]
    LlmTimeout,

    // Driver loop errors
    #[error("Max state transitions exceeded")]
    MaxTransitionsExceeded,

    #[error("Precondition rejected: {0}")]
    PreconditionRejected(String),

    #[error("Agent {agent} failed: {reason}")]
    AgentExecutionFailed { agent: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Plan too complex: {steps} steps > {limit} allowed")]
    PlanTooComplex { steps: usize, limit: usize },

    #[error("Intent unclear (confidence {confidence:.2})")]
    IntentUnclear { confidence: f64 },

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistantErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Backend(_) => "The kitchen backend is unreachable. Try again shortly",
            Self::LlmProvider(_) => "LLM provider unavailable. Check your API key and network",
            Self::LlmTimeout => "The model took too long to respond. Try again",
            Self::MaxTransitionsExceeded => {
                "Request too complex. Try breaking it into smaller steps"
            }
            Self::PreconditionRejected(_) => "That action is not permitted for this request",
            Self::AgentExecutionFailed { .. } => "A step of your request failed. Try again",
            Self::ValidationFailed(_) => "The data provided did not pass validation",
            Self::PlanTooComplex { .. } => {
                "Your request is too complex. Please break it into smaller tasks"
            }
            Self::IntentUnclear { .. } => "Could you rephrase that more specifically?",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Operator attention required
            Self::Config(_) => false,

            // Everything else can be retried or rephrased
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::PlanTooComplex { steps: 6, limit: 5 };
        assert_eq!(err.to_string(), "Plan too complex: 6 steps > 5 allowed");

        let err = EngineError::AgentExecutionFailed {
            agent: "ocr".to_string(),
            reason: "empty image".to_string(),
        };
        assert_eq!(err.to_string(), "Agent ocr failed: empty image");
    }

    #[test]
    fn test_user_hints_are_scrubbed() {
        let errors = vec![
            EngineError::Config("bad path /home/user/.larder".to_string()),
            EngineError::Backend("connection refused 10.0.0.2:8080".to_string()),
            EngineError::LlmProvider("401 bad key sk-test".to_string()),
        ];

        for err in errors {
            let hint = err.user_hint();
            assert!(!hint.contains("sk-"), "hint leaks key material: {hint}");
            assert!(!hint.contains("10.0."), "hint leaks address: {hint}");
            assert!(!hint.contains("/home"), "hint leaks path: {hint}");
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(!EngineError::Config("broken".to_string()).is_recoverable());
        assert!(EngineError::LlmTimeout.is_recoverable());
        assert!(EngineError::MaxTransitionsExceeded.is_recoverable());
        assert!(EngineError::IntentUnclear { confidence: 0.4 }.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert!(err.is_recoverable());
    }
}
