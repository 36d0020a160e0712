//! KeyValueStore Tests
//!
//! Tests verify:
//! - Basic put/get/delete
//! - Last-write-wins semantics
//! - Idempotent delete
//! - Snapshot ordering
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use durakv::{DuraError, KeyValueStore};

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = KeyValueStore::new();
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_get_missing_key_is_no_such_key() {
    let store = KeyValueStore::new();
    assert!(matches!(store.get("empty-start"), Err(DuraError::NoSuchKey)));
}

#[test]
fn test_put_and_get() {
    let store = KeyValueStore::new();

    store.put("key1", "value1");

    assert_eq!(store.get("key1").unwrap(), "value1");
    assert!(store.contains_key("key1"));
}

#[test]
fn test_put_overwrites_existing() {
    let store = KeyValueStore::new();

    store.put("1", "1");
    store.put("2", "2");
    store.put("3", "3");
    assert_eq!(store.len(), 3);

    store.put("1", "0");
    assert_eq!(store.len(), 3);
    assert_eq!(store.get("1").unwrap(), "0");
}

#[test]
fn test_empty_value_is_a_value() {
    let store = KeyValueStore::new();

    store.put("blank", "");

    assert_eq!(store.get("blank").unwrap(), "");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_key() {
    let store = KeyValueStore::new();

    store.put("1", "1");
    store.delete("1");

    assert!(matches!(store.get("1"), Err(DuraError::NoSuchKey)));
    assert!(store.is_empty());
}

#[test]
fn test_delete_missing_key_is_noop() {
    let store = KeyValueStore::new();
    store.put("keep", "me");

    store.delete("never-set");

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("keep").unwrap(), "me");
}

#[test]
fn test_put_after_delete() {
    let store = KeyValueStore::new();

    store.put("k", "v1");
    store.delete("k");
    store.put("k", "v2");

    assert_eq!(store.get("k").unwrap(), "v2");
}

#[test]
fn test_last_operation_wins_over_mixed_history() {
    let store = KeyValueStore::new();
    let ops: &[(&str, Option<&str>)] = &[
        ("a", Some("1")),
        ("b", Some("2")),
        ("a", None),
        ("c", Some("3")),
        ("b", Some("4")),
        ("c", None),
        ("c", Some("5")),
    ];

    for (key, value) in ops {
        match value {
            Some(v) => store.put(*key, *v),
            None => store.delete(key),
        }
    }

    assert!(matches!(store.get("a"), Err(DuraError::NoSuchKey)));
    assert_eq!(store.get("b").unwrap(), "4");
    assert_eq!(store.get("c").unwrap(), "5");
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_is_sorted_copy() {
    let store = KeyValueStore::new();
    store.put("zebra", "z");
    store.put("apple", "a");
    store.put("mango", "m");

    let snapshot = store.snapshot();
    let keys: Vec<&String> = snapshot.keys().collect();
    assert_eq!(keys, vec!["apple", "mango", "zebra"]);

    // Later writes don't leak into an earlier snapshot
    store.put("banana", "b");
    assert_eq!(snapshot.len(), 3);
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_reads() {
    let store = Arc::new(KeyValueStore::new());
    store.put("key", "value");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(store.get("key").unwrap(), "value");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_writes() {
    let store = Arc::new(KeyValueStore::new());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for j in 0..10 {
                    store.put(format!("key{}_{}", i, j), format!("value{}_{}", i, j));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    assert_eq!(store.get("key7_3").unwrap(), "value7_3");
}

#[test]
fn test_concurrent_mixed_operations() {
    let store = Arc::new(KeyValueStore::new());
    for i in 0..50 {
        store.put(format!("k{}", i), "initial");
    }

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..50 {
                if i % 2 == 0 {
                    store.delete(&format!("k{}", i));
                } else {
                    store.put(format!("k{}", i), "updated");
                }
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..50 {
                // Either state is fine; it just must never be torn
                if let Ok(v) = store.get(&format!("k{}", i)) {
                    assert!(v == "initial" || v == "updated");
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(store.len(), 25);
}
