//! Short-term memory: an ephemeral key → JSON map scoped to one agent session.

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct SessionMemory {
    entries: HashMap<String, Value>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn add_short_term(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get_short_term(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_then_get() {
        let mut s = SessionMemory::new();
        s.add_short_term("last_task", json!("plan a trip"));
        assert_eq!(s.get_short_term("last_task"), Some(&json!("plan a trip")));
        assert_eq!(s.get_short_term("other"), None);
    }

    #[test]
    fn add_overwrites() {
        let mut s = SessionMemory::new();
        s.add_short_term("k", json!(1));
        s.add_short_term("k", json!(2));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get_short_term("k"), Some(&json!(2)));
        s.clear();
        assert!(s.is_empty());
    }
}
