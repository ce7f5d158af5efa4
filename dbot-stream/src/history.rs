//! Bounded in-memory conversation history, keyed by user or chat.
//!
//! The registry is an owned value with an explicit lifecycle: a conversation is created on first use,
//! every insert trims it to `max_entries`, and [`HistoryRegistry::remove`] drops it. Callers that share
//! it between tasks wrap it in a lock themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One remembered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryRegistry {
    max_entries: usize,
    conversations: HashMap<String, VecDeque<HistoryEntry>>,
}

impl HistoryRegistry {
    /// Creates an empty registry keeping at most `max_entries` per key (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            conversations: HashMap::new(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Appends `entry` to the conversation of `key`, creating it on first use and dropping the oldest
    /// entries beyond capacity.
    pub fn push(&mut self, key: &str, entry: HistoryEntry) {
        let max_entries = self.max_entries;
        let conversation = self.conversations.entry(key.to_string()).or_default();
        conversation.push_back(entry);
        let excess = conversation.len().saturating_sub(max_entries);
        if excess > 0 {
            conversation.drain(..excess);
            debug!(key = %key, dropped = excess, "history trimmed");
        }
    }

    pub fn add_user_message(&mut self, key: &str, content: impl Into<String>) {
        self.push(key, HistoryEntry::new(Role::User, content));
    }

    pub fn add_assistant_message(&mut self, key: &str, content: impl Into<String>) {
        self.push(key, HistoryEntry::new(Role::Assistant, content));
    }

    /// Entries of `key`, oldest first. Empty for unknown keys.
    pub fn messages(&self, key: &str) -> Vec<HistoryEntry> {
        self.conversations
            .get(key)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len_of(&self, key: &str) -> usize {
        self.conversations.get(key).map_or(0, VecDeque::len)
    }

    /// Drops the conversation of `key`; returns its entries.
    pub fn remove(&mut self, key: &str) -> Option<Vec<HistoryEntry>> {
        self.conversations.remove(key).map(Vec::from)
    }

    /// Number of conversations held.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_on_first_use() {
        let mut registry = HistoryRegistry::new(10);
        assert!(registry.is_empty());
        assert!(registry.messages("alice").is_empty());

        registry.add_user_message("alice", "hi");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.len_of("alice"), 1);
        assert_eq!(registry.messages("alice")[0].role, Role::User);
    }

    #[test]
    fn test_trims_oldest_beyond_capacity() {
        let mut registry = HistoryRegistry::new(3);
        for i in 0..5 {
            registry.add_user_message("u", format!("q{i}"));
        }

        let contents: Vec<_> = registry
            .messages("u")
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn test_keys_are_isolated() {
        let mut registry = HistoryRegistry::new(2);
        registry.add_user_message("a", "1");
        registry.add_assistant_message("a", "2");
        registry.add_assistant_message("a", "3");
        registry.add_user_message("b", "x");

        assert_eq!(registry.len_of("a"), 2);
        assert_eq!(registry.len_of("b"), 1);
        assert_eq!(registry.messages("b")[0].content, "x");
    }

    #[test]
    fn test_remove_evicts_conversation() {
        let mut registry = HistoryRegistry::new(4);
        registry.add_user_message("a", "1");

        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(registry.is_empty());
        assert!(registry.remove("a").is_none());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut registry = HistoryRegistry::new(0);
        registry.add_user_message("a", "1");
        registry.add_user_message("a", "2");
        assert_eq!(registry.max_entries(), 1);
        assert_eq!(registry.messages("a")[0].content, "2");
    }

    #[test]
    fn test_entry_serializes_with_lowercase_role() {
        let entry = HistoryEntry::new(Role::Assistant, "ok");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }
}
