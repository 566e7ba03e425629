//! Per-user conversation history
//!
//! Process-wide, concurrently accessed record of the last exchanges per user.
//! Entries are append-then-trim with last-write-wins semantics; the list is
//! capped at the most recent ten exchanges per user. This is observational
//! context only; nothing in the control flow reads it back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Maximum number of exchanges retained per user
const MAX_EXCHANGES: usize = 10;

/// One user/assistant exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

/// Bounded per-user conversation history
#[derive(Clone, Default)]
pub struct ConversationHistory {
    entries: Arc<RwLock<HashMap<String, Vec<Exchange>>>>,
}

impl ConversationHistory {
    /// Create an empty history store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exchange for the given user, trimming to the cap
    pub fn record(&self, user_email: &str, user_message: &str, reply: &str) {
        let mut entries = self.entries.write().expect("history lock poisoned");
        let history = entries.entry(user_email.to_string()).or_default();
        history.push(Exchange {
            user: user_message.to_string(),
            assistant: reply.to_string(),
            at: Utc::now(),
        });
        if history.len() > MAX_EXCHANGES {
            let excess = history.len() - MAX_EXCHANGES;
            history.drain(..excess);
        }
    }

    /// Most recent `n` exchanges for a user, oldest first
    pub fn recent(&self, user_email: &str, n: usize) -> Vec<Exchange> {
        let entries = self.entries.read().expect("history lock poisoned");
        entries
            .get(user_email)
            .map(|history| {
                let start = history.len().saturating_sub(n);
                history[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Number of retained exchanges for a user
    pub fn len(&self, user_email: &str) -> usize {
        let entries = self.entries.read().expect("history lock poisoned");
        entries.get(user_email).map(Vec::len).unwrap_or(0)
    }

    /// Whether a user has no retained exchanges
    pub fn is_empty(&self, user_email: &str) -> bool {
        self.len(user_email) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_recent() {
        let history = ConversationHistory::new();
        history.record("a@example.com", "hello", "Hi there!");
        history.record("a@example.com", "show inventory", "You have 3 items");

        let recent = history.recent("a@example.com", 5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user, "hello");
        assert_eq!(recent[1].assistant, "You have 3 items");
    }

    #[test]
    fn test_cap_at_ten_exchanges() {
        let history = ConversationHistory::new();
        for i in 0..15 {
            history.record("a@example.com", &format!("msg {i}"), &format!("reply {i}"));
        }

        assert_eq!(history.len("a@example.com"), 10);
        let recent = history.recent("a@example.com", 10);
        // Oldest retained entry is msg 5
        assert_eq!(recent[0].user, "msg 5");
        assert_eq!(recent[9].user, "msg 14");
    }

    #[test]
    fn test_users_are_isolated() {
        let history = ConversationHistory::new();
        history.record("a@example.com", "hello", "hi");
        history.record("b@example.com", "hey", "hello");

        assert_eq!(history.len("a@example.com"), 1);
        assert_eq!(history.len("b@example.com"), 1);
        assert_eq!(history.recent("a@example.com", 5)[0].user, "hello");
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let history = ConversationHistory::new();
        assert!(history.is_empty("nobody@example.com"));
        assert!(history.recent("nobody@example.com", 3).is_empty());
    }

    #[test]
    fn test_concurrent_records() {
        let history = ConversationHistory::new();
        let mut handles = Vec::new();
        for t in 0..8 {
            let history = history.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..20 {
                    history.record("shared@example.com", &format!("t{t} m{i}"), "ok");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Cap holds under concurrent appends
        assert_eq!(history.len("shared@example.com"), 10);
    }
}
