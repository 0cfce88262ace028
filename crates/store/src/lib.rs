//! Key-value persistence for node state.
//!
//! Everything a node keeps across restarts goes through the
//! [`KeyValueStore`] trait: binary keys, binary values, and atomic
//! [`WriteBatch`] commits for multi-key updates. [`SqliteStore`] is the
//! durable backend; [`MemoryStore`] has the same contract for tests and
//! short-lived tools.

#![warn(missing_docs)]

pub mod error;
pub mod kv;
pub mod memory;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use kv::{BatchOp, KeyValueStore, WriteBatch};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
