//! In-process key-value store holding raw JSON per snapshot key.

use crate::{parse_snapshot, snapshot_key, SnapshotStore, StorageError};
use doc_model::{DocumentId, Snapshot};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    puts: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses writes once the stored payloads would exceed
    /// `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { quota_bytes: Some(quota_bytes), ..Self::default() }
    }

    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of successful writes so far.
    pub fn put_count(&self) -> usize {
        self.puts.get()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, id: &DocumentId) -> Result<Option<Snapshot>, StorageError> {
        let key = snapshot_key(id);
        let entries = self.entries.borrow();
        let Some(raw) = entries.get(&key) else {
            return Ok(None);
        };

        parse_snapshot(&key, raw.as_bytes()).map(Some)
    }

    fn put(&self, id: &DocumentId, snapshot: &Snapshot) -> Result<(), StorageError> {
        let key = snapshot_key(id);
        let value = serde_json::to_string(snapshot)?;

        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_without(&key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::Unavailable {
                    reason: format!("quota of {quota} bytes exceeded ({needed} needed)"),
                });
            }
        }

        self.entries.borrow_mut().insert(key, value);
        self.puts.set(self.puts.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_snapshot() {
        let store = MemoryStore::new();
        let id = DocumentId::from("a");
        let snapshot = Snapshot { status: "done".to_owned(), ..Snapshot::default() };

        store.put(&id, &snapshot).expect("put should succeed");

        assert_eq!(store.get(&id).expect("get should succeed"), Some(snapshot));
        assert_eq!(store.put_count(), 1);
        assert!(store.raw("documentData_a").is_some());
    }

    #[test]
    fn malformed_payload_is_reported() {
        let store = MemoryStore::new();
        store.insert_raw("documentData_b", "[1, 2");

        let result = store.get(&DocumentId::from("b"));
        assert!(matches!(result, Err(StorageError::Malformed { .. })));
    }

    #[test]
    fn quota_rejects_oversized_writes_and_keeps_old_value() {
        let store = MemoryStore::with_quota(80);
        let id = DocumentId::from("c");
        let small = Snapshot { comment: "ok".to_owned(), ..Snapshot::default() };
        store.put(&id, &small).expect("small put should fit");

        let large = Snapshot { comment: "x".repeat(200), ..Snapshot::default() };
        let result = store.put(&id, &large);

        assert!(matches!(result, Err(StorageError::Unavailable { .. })));
        assert_eq!(store.get(&id).expect("get should succeed"), Some(small));
        assert_eq!(store.put_count(), 1);
    }
}
