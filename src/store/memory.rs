//! In-memory store, used for tests and ephemeral sessions

use super::LocalStore;
use crate::error::Result;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut map = self.entries.write();
        map.extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("favorites").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_many_writes_all() {
        let store = MemoryStore::new();
        store
            .set_many(vec![
                ("favorites".into(), json!(["song1"])),
                ("lastSyncTimestamp".into(), json!(7)),
            ])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("lastSyncTimestamp").unwrap(), Some(json!(7)));
    }
}
