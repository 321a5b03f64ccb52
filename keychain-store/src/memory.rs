use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{StoreError, StoreResult};
use crate::{Batch, BatchOp, Store};

/// In-memory store, primarily for tests and short-lived processes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().unwrap().contains_key(key))
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.lock().unwrap().remove(key);
        Ok(())
    }

    fn query(&self, _keys_only: bool) -> StoreResult<Vec<String>> {
        Ok(self.inner.lock().unwrap().keys().cloned().collect())
    }

    fn batch(&self) -> Option<Box<dyn Batch>> {
        Some(Box::new(MemoryBatch {
            store: self.inner.clone(),
            ops: Vec::new(),
        }))
    }
}

struct MemoryBatch {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    ops: Vec<BatchOp>,
}

impl Batch for MemoryBatch {
    fn put(&mut self, key: String, value: Vec<u8>) {
        self.ops.push(BatchOp::Put(key, value));
    }

    fn delete(&mut self, key: String) {
        self.ops.push(BatchOp::Delete(key));
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut guard = self.store.lock().unwrap();
        for op in self.ops {
            match op {
                BatchOp::Put(k, v) => {
                    guard.insert(k, v);
                }
                BatchOp::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_round_trip() {
        let store = MemoryStore::new();
        store.put("/alice", b"one").unwrap();
        assert!(store.has("/alice").unwrap());
        assert_eq!(store.get("/alice").unwrap(), b"one");
        store.delete("/alice").unwrap();
        assert!(!store.has("/alice").unwrap());
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get("/nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn batch_commits_put_and_delete_together() {
        let store = MemoryStore::new();
        store.put("/old", b"x").unwrap();
        let mut batch = store.batch().unwrap();
        batch.put("/new".to_string(), b"x".to_vec());
        batch.delete("/old".to_string());
        batch.commit().unwrap();
        assert!(!store.has("/old").unwrap());
        assert!(store.has("/new").unwrap());
    }

    #[test]
    fn query_lists_all_keys() {
        let store = MemoryStore::new();
        store.put("/a", b"1").unwrap();
        store.put("/b", b"2").unwrap();
        let mut keys = store.query(true).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["/a".to_string(), "/b".to_string()]);
    }
}
