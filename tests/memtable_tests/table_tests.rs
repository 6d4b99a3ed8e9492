//! MemTable Tests
//!
//! Verifies basic CRUD operations, tombstone handling, size tracking,
//! sorted iteration, and concurrent access patterns.

use atlaskv::memtable::{MemTable, MemTableEntry};

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.entry_count(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn put_and_get() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    assert_eq!(memtable.get(b"key1"), Some(MemTableEntry::Value(b"value1".to_vec())));
}

#[test]
fn get_nonexistent_key() {
    let memtable = MemTable::new();
    assert_eq!(memtable.get(b"nonexistent"), None);
}

#[test]
fn put_multiple_entries() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.put(b"key2".to_vec(), b"value2".to_vec());
    memtable.put(b"key3".to_vec(), b"value3".to_vec());

    assert_eq!(memtable.entry_count(), 3);
    assert_eq!(memtable.get(b"key1"), Some(MemTableEntry::Value(b"value1".to_vec())));
    assert_eq!(memtable.get(b"key2"), Some(MemTableEntry::Value(b"value2".to_vec())));
    assert_eq!(memtable.get(b"key3"), Some(MemTableEntry::Value(b"value3".to_vec())));
}

#[test]
fn put_overwrites_existing() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.put(b"key1".to_vec(), b"value2".to_vec());

    assert_eq!(memtable.entry_count(), 1);
    assert_eq!(memtable.get(b"key1"), Some(MemTableEntry::Value(b"value2".to_vec())));
}

// =============================================================================
// Delete / Tombstone Tests
// =============================================================================

#[test]
fn delete_creates_tombstone() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.delete(b"key1".to_vec());

    assert_eq!(memtable.get(b"key1"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.entry_count(), 1);
}

#[test]
fn delete_nonexistent_key() {
    let memtable = MemTable::new();
    memtable.delete(b"nonexistent".to_vec());

    assert_eq!(memtable.get(b"nonexistent"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.entry_count(), 1);
}

#[test]
fn put_after_delete() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.delete(b"key1".to_vec());
    memtable.put(b"key1".to_vec(), b"value2".to_vec());

    assert_eq!(memtable.get(b"key1"), Some(MemTableEntry::Value(b"value2".to_vec())));
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn size_tracking_put() {
    let memtable = MemTable::new();
    assert_eq!(memtable.size(), 0);

    memtable.put(b"key".to_vec(), b"value".to_vec());
    assert_eq!(memtable.size(), b"key".len() + b"value".len());
}

#[test]
fn size_tracking_multiple_puts() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.put(b"key2".to_vec(), b"value2".to_vec());

    let expected = (b"key1".len() + b"value1".len()) + (b"key2".len() + b"value2".len());
    assert_eq!(memtable.size(), expected);
}

#[test]
fn size_tracking_overwrite_shrinks() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"much_longer_value".to_vec());
    let before = memtable.size();

    memtable.put(b"key".to_vec(), b"short".to_vec());
    let after = memtable.size();

    assert!(after < before);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn iter_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.iter().count(), 0);
}

#[test]
fn iter_sorted_order() {
    let memtable = MemTable::new();
    memtable.put(b"cherry".to_vec(), b"3".to_vec());
    memtable.put(b"apple".to_vec(), b"1".to_vec());
    memtable.put(b"banana".to_vec(), b"2".to_vec());

    let entries: Vec<_> = memtable.iter().collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].0, b"apple");
    assert_eq!(entries[1].0, b"banana");
    assert_eq!(entries[2].0, b"cherry");
}

#[test]
fn iter_includes_tombstones() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.delete(b"key2".to_vec());
    memtable.put(b"key3".to_vec(), b"value3".to_vec());

    let entries: Vec<_> = memtable.iter().collect();
    assert_eq!(entries.len(), 3);
    assert!(matches!(entries[0].1, MemTableEntry::Value(_)));
    assert!(matches!(entries[1].1, MemTableEntry::Tombstone));
    assert!(matches!(entries[2].1, MemTableEntry::Value(_)));
}

#[test]
fn iter_is_a_snapshot() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());

    let entries: Vec<_> = memtable.iter().collect();
    memtable.put(b"key".to_vec(), b"modified".to_vec());

    match &entries[0].1 {
        MemTableEntry::Value(v) => assert_eq!(v, b"value"),
        _ => panic!("expected Value"),
    }
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn clear() {
    let memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.put(b"key2".to_vec(), b"value2".to_vec());
    assert_eq!(memtable.entry_count(), 2);

    memtable.clear();

    assert_eq!(memtable.entry_count(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
    assert_eq!(memtable.get(b"key1"), None);
}

// =============================================================================
// Should Flush Tests
// =============================================================================

#[test]
fn should_flush_under_limit() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());
    assert!(!memtable.should_flush(1000));
}

#[test]
fn should_flush_at_or_over_limit() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());

    let size = memtable.size();
    assert!(memtable.should_flush(size - 1));
    assert!(memtable.should_flush(size));
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn empty_key() {
    let memtable = MemTable::new();
    memtable.put(vec![], b"value".to_vec());
    assert_eq!(memtable.get(&[]), Some(MemTableEntry::Value(b"value".to_vec())));
}

#[test]
fn empty_value() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), vec![]);
    assert_eq!(memtable.get(b"key"), Some(MemTableEntry::Value(vec![])));
}

#[test]
fn large_value() {
    let memtable = MemTable::new();
    let large_value = vec![0xAB; 1024 * 1024];
    memtable.put(b"big_key".to_vec(), large_value.clone());

    match memtable.get(b"big_key") {
        Some(MemTableEntry::Value(v)) => assert_eq!(v, large_value),
        _ => panic!("expected Value"),
    }
}

#[test]
fn many_entries_stay_sorted() {
    let memtable = MemTable::new();
    for i in 0..1000 {
        let key = format!("key{:04}", i).into_bytes();
        let value = format!("value{}", i).into_bytes();
        memtable.put(key, value);
    }

    assert_eq!(memtable.entry_count(), 1000);

    let entries: Vec<_> = memtable.iter().collect();
    for i in 0..999 {
        assert!(entries[i].0 < entries[i + 1].0);
    }
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn concurrent_reads() {
    use std::sync::Arc;
    use std::thread;

    let memtable = Arc::new(MemTable::new());
    memtable.put(b"key".to_vec(), b"value".to_vec());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let mt = Arc::clone(&memtable);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(mt.get(b"key"), Some(MemTableEntry::Value(b"value".to_vec())));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn concurrent_writes() {
    use std::sync::Arc;
    use std::thread;

    let memtable = Arc::new(MemTable::new());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let mt = Arc::clone(&memtable);
            thread::spawn(move || {
                for j in 0..10 {
                    let key = format!("key{}_{}", i, j).into_bytes();
                    let value = format!("value{}_{}", i, j).into_bytes();
                    mt.put(key, value);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(memtable.entry_count(), 100);
}
