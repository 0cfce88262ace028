//! Contract tests run against every store backend.
//!
//! Both backends must be interchangeable behind the trait: same
//! results for reads, writes, deletes, and staged batches, including
//! the rollback-then-reuse flow.

use weft_store::{KeyValueStore, MemoryStore, SqliteStore, WriteBatch};

fn backends() -> Vec<(&'static str, Box<dyn KeyValueStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        (
            "sqlite",
            Box::new(SqliteStore::open_in_memory().expect("open sqlite")),
        ),
    ]
}

#[test]
fn test_single_key_lifecycle() {
    for (name, store) in backends() {
        assert_eq!(store.get(b"k").unwrap(), None, "{name}");
        store.put(b"k", b"v1").unwrap();
        assert!(store.has(b"k").unwrap(), "{name}");
        store.put(b"k", b"v2").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()), "{name}");
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None, "{name}");
    }
}

#[test]
fn test_batch_commit_is_visible_at_once() {
    for (name, store) in backends() {
        let mut batch = WriteBatch::new();
        for i in 0..10u8 {
            batch.put(&[i], &[i, i]);
        }
        store.commit(&batch).unwrap();
        for i in 0..10u8 {
            assert_eq!(store.get(&[i]).unwrap(), Some(vec![i, i]), "{name}");
        }
    }
}

#[test]
fn test_batch_rollback_then_restage() {
    for (name, store) in backends() {
        let mut batch = WriteBatch::new();
        batch.put(b"dropped", b"1");
        batch.rollback();
        batch.put(b"kept", b"2");
        store.commit(&batch).unwrap();

        assert!(!store.has(b"dropped").unwrap(), "{name}");
        assert_eq!(store.get(b"kept").unwrap(), Some(b"2".to_vec()), "{name}");
    }
}

#[test]
fn test_batch_delete_of_preexisting_key() {
    for (name, store) in backends() {
        store.put(b"old", b"stale").unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"new", b"fresh");
        batch.delete(b"old");
        store.commit(&batch).unwrap();

        assert!(!store.has(b"old").unwrap(), "{name}");
        assert!(store.has(b"new").unwrap(), "{name}");
    }
}

#[test]
fn test_commit_leaves_batch_reusable() {
    let first = MemoryStore::new();
    let second = SqliteStore::open_in_memory().unwrap();

    let mut batch = WriteBatch::new();
    batch.put(b"shared", b"value");
    first.commit(&batch).unwrap();
    second.commit(&batch).unwrap();

    assert_eq!(first.get(b"shared").unwrap(), Some(b"value".to_vec()));
    assert_eq!(second.get(b"shared").unwrap(), Some(b"value".to_vec()));
    assert_eq!(batch.len(), 1);
}

#[test]
fn test_empty_and_binary_keys() {
    for (name, store) in backends() {
        let binary_key = [0u8, 255, 7, 0];
        store.put(&binary_key, b"raw").unwrap();
        assert_eq!(
            store.get(&binary_key).unwrap(),
            Some(b"raw".to_vec()),
            "{name}"
        );

        store.put(b"", b"empty key").unwrap();
        assert_eq!(
            store.get(b"").unwrap(),
            Some(b"empty key".to_vec()),
            "{name}"
        );
    }
}
