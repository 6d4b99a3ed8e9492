//! MemTable implementation
//!
//! `BTreeMap`-based memtable guarded by a `parking_lot::RwLock`. A single
//! map holds both live values and tombstones (see `MemTableEntry`) so that
//! a flush can carry tombstones into the new SSTable directly, rather than
//! tracking a separate deleted-keys set that would be dropped at flush
//! time, silently resurrecting a deleted key whose value still lives in
//! an older SSTable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::MemTableEntry;

/// In-memory table for recent writes.
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, MemTableEntry>>,
    /// Approximate size in bytes of all keys + values currently held.
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get a value by key (read lock). Returns `None` if the key is
    /// absent; returns `Some(MemTableEntry::Tombstone)` if the most recent
    /// operation against this key in the current epoch was a delete.
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock). Returns the memtable's new
    /// approximate size in bytes.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let mut data = self.data.write();
        let added = key.len() + value.len();
        let removed = Self::entry_size(data.get(&key));
        data.insert(key, MemTableEntry::Value(value));
        self.adjust_size(added, removed)
    }

    /// Delete a key (write lock, inserts a tombstone). Returns the
    /// memtable's new approximate size in bytes.
    pub fn delete(&self, key: Vec<u8>) -> usize {
        let mut data = self.data.write();
        let added = key.len();
        let removed = Self::entry_size(data.get(&key));
        data.insert(key, MemTableEntry::Tombstone);
        self.adjust_size(added, removed)
    }

    fn entry_size(entry: Option<&MemTableEntry>) -> usize {
        match entry {
            None => 0,
            Some(MemTableEntry::Value(v)) => v.len(),
            Some(MemTableEntry::Tombstone) => 0,
        }
    }

    fn adjust_size(&self, added: usize, removed_value_len: usize) -> usize {
        // `added` already counts the new key+value bytes; `removed_value_len`
        // is only the value portion of a previous entry for the same key
        // (the key bytes were already counted and are being overwritten,
        // not duplicated), so we subtract just that.
        if removed_value_len > 0 {
            self.size.fetch_sub(removed_value_len, Ordering::Relaxed);
        }
        self.size.fetch_add(added, Ordering::Relaxed) + added
    }

    /// Approximate size in bytes of all entries currently held.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Number of distinct keys currently held (values and tombstones).
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the memtable currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Whether this memtable's size has reached `size_limit`.
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot all entries in sorted key order (for flush).
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<_> = self.data.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        MemTableIterator { entries: entries.into_iter() }
    }

    /// Clear all entries (after a successful flush) and reset the size
    /// counter.
    pub fn clear(&self) {
        self.data.write().clear();
        self.size.store(0, Ordering::Relaxed);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a MemTable snapshot, in sorted key order.
pub struct MemTableIterator {
    entries: std::vec::IntoIter<(Vec<u8>, MemTableEntry)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}
