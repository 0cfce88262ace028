//! In-memory store for tests and short-lived tooling.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::kv::{BatchOp, KeyValueStore, WriteBatch};

/// Hash-map backend with the same contract as the durable store.
///
/// Values are copied on the way in and out, so callers can never alias
/// the map's own buffers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self
            .map
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .len())
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.map
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .map
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(key)
            .cloned())
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self
            .map
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.map
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key);
        Ok(())
    }

    fn commit(&self, batch: &WriteBatch) -> StoreResult<()> {
        // One write lock for the whole batch keeps it atomic for readers.
        let mut map = self.map.write().map_err(|_| StoreError::LockPoisoned)?;
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    map.remove(key);
                }
            }
        }
        Ok(())
    }
}
