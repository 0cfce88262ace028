//! Backend-neutral key-value contract and staged write batches.

use crate::error::StoreResult;

/// One staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite `key` with `value`.
    Put {
        /// The key to write.
        key: Vec<u8>,
        /// The value to store under it.
        value: Vec<u8>,
    },
    /// Remove `key` if present.
    Delete {
        /// The key to remove.
        key: Vec<u8>,
    },
}

/// A buffer of writes applied to a store in one atomic commit.
///
/// Operations accumulate in order until the batch is handed to
/// [`KeyValueStore::commit`]. Committing does not drain the batch, so
/// the same batch can be committed to several stores; [`rollback`]
/// discards everything staged so far and readies the batch for reuse.
///
/// [`rollback`]: WriteBatch::rollback
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an insert or overwrite.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Stages a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Discards all staged operations.
    pub fn rollback(&mut self) {
        self.ops.clear();
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The staged operations in commit order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

/// Minimal binary key-value contract shared by all store backends.
///
/// Values are owned copies on the way out; mutating a returned value
/// never touches the store. Reading a missing key is not an error, it
/// is `None`.
pub trait KeyValueStore: Send + Sync {
    /// Inserts or overwrites `key` with `value`.
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Reads the value under `key`, if any.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Whether `key` is present.
    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// Applies every operation in `batch`, all or nothing.
    fn commit(&self, batch: &WriteBatch) -> StoreResult<()>;
}
