//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full, and checkpoints on a clock
//! - Manage crash recovery on startup

use std::path::Path;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{AtlasError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{DirectoryLock, SSTableManager, SSTableValue, StorageStats};
use crate::wal::{self, Operation, WalWriter};

/// Lifecycle state of an [`Engine`]. Reads, writes, and `stats()` are only
/// accepted in `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Aggregate statistics reported by [`Engine::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub memtable_size: usize,
    pub deleted_count: usize,
    pub sstable_count: usize,
    pub total_entries: u64,
    pub total_bytes: u64,
    pub wal_bytes: u64,
}

/// Mutable state touched only while the write lock is held.
struct WriteState {
    state: EngineState,
    wal: WalWriter,
    writes_since_flush: u64,
    last_checkpoint: Instant,
}

/// The core storage engine: coordinates the WAL, the memtable, and the
/// SSTable manager behind a single-writer/multi-reader policy.
///
/// ## Concurrency model
/// Reads run lock-free against the memtable (itself internally
/// synchronized) and against the manager's own reader-writer policy over
/// the SSTable list. Writes (`put`/`delete`/`batch_put`/`flush`/
/// `compact`) are serialized by one write mutex covering the WAL and the
/// engine's lifecycle state.
pub struct Engine {
    config: Config,
    memtable: MemTable,
    storage: SSTableManager,
    write: Mutex<WriteState>,
    _lock: DirectoryLock,
}

impl Engine {
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open or create an engine rooted at `config.data_dir`.
    ///
    /// Startup procedure: acquire the exclusive directory lock, open the
    /// SSTable manager (which reads the manifest and loads existing
    /// tables), then open the WAL and replay it into the memtable. No
    /// implicit flush is performed after replay — the WAL is retained
    /// until the next threshold-triggered checkpoint.
    pub fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let lock = DirectoryLock::acquire(&config.data_dir)?;
        let storage = SSTableManager::open(&config.data_dir)?;
        let memtable = MemTable::new();

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        if wal_path.exists() {
            let result = wal::recovery::replay(&wal_path, |operation, _timestamp| match operation {
                Operation::Put { key, value } => {
                    memtable.put(key, value);
                }
                Operation::Delete { key } => {
                    memtable.delete(key);
                }
            })?;

            if result.records_recovered > 0 || result.records_corrupted > 0 {
                tracing::info!(
                    recovered = result.records_recovered,
                    corrupted = result.records_corrupted,
                    truncated = result.was_truncated,
                    "replayed write-ahead log on open"
                );
            }
        }

        let wal = if wal_path.exists() {
            WalWriter::open_append(&wal_path)?
        } else {
            WalWriter::create(&wal_path)?
        };

        Ok(Self {
            config,
            memtable,
            storage,
            write: Mutex::new(WriteState {
                state: EngineState::Open,
                wal,
                writes_since_flush: 0,
                last_checkpoint: Instant::now(),
            }),
            _lock: lock,
        })
    }

    /// Convenience constructor using [`Config::default`] with `path` as
    /// the data directory.
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path.to_path_buf()).build();
        Self::open(config)
    }

    fn ensure_open(write: &WriteState) -> Result<()> {
        if write.state != EngineState::Open {
            return Err(AtlasError::Closed);
        }
        Ok(())
    }

    /// Insert or overwrite a key. Returns `false` with no side effects if
    /// either `key` or `value` is empty.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        if key.is_empty() || value.is_empty() {
            return Ok(false);
        }

        let mut write = self.write.lock();
        Self::ensure_open(&write)?;

        write.wal.append(Operation::Put { key: key.to_vec(), value: value.to_vec() }, now_millis())?;
        self.memtable.put(key.to_vec(), value.to_vec());
        write.writes_since_flush += 1;

        self.maybe_flush_and_checkpoint(&mut write)?;
        Ok(true)
    }

    /// Read a key: memtable first (a tombstone there means deleted), then
    /// the SSTable manager newest-to-oldest.
    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        {
            let write = self.write.lock();
            Self::ensure_open(&write)?;
        }

        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        match self.storage.get(key)? {
            Some(SSTableValue::Value(value)) => Ok(Some(value)),
            Some(SSTableValue::Tombstone) | None => Ok(None),
        }
    }

    /// Delete a key. Returns `false` if `key` is empty; otherwise always
    /// returns `true`, whether or not the key previously existed.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }

        let mut write = self.write.lock();
        Self::ensure_open(&write)?;

        write.wal.append(Operation::Delete { key: key.to_vec() }, now_millis())?;
        self.memtable.delete(key.to_vec());
        write.writes_since_flush += 1;

        self.maybe_flush_and_checkpoint(&mut write)?;
        Ok(true)
    }

    /// Put every `(key, value)` pair under one held write-lock section.
    /// Returns `true` iff every record was durably appended to the WAL;
    /// the first record that fails to append aborts the batch and
    /// propagates the underlying error without touching the memtable for
    /// records after the failure point.
    pub fn batch_put(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<bool> {
        let mut write = self.write.lock();
        Self::ensure_open(&write)?;

        for (key, value) in entries {
            if key.is_empty() || value.is_empty() {
                return Ok(false);
            }
        }

        for (key, value) in entries {
            write.wal.append(Operation::Put { key: key.clone(), value: value.clone() }, now_millis())?;
            self.memtable.put(key.clone(), value.clone());
            write.writes_since_flush += 1;
        }

        self.maybe_flush_and_checkpoint(&mut write)?;
        Ok(true)
    }

    /// Entries with `start <= key < end`: the manager's on-disk range,
    /// overlaid by matching memtable entries (which may add, change, or
    /// remove keys the disk range reported).
    pub fn read_key_range(&self, start: &[u8], end: &[u8]) -> Result<std::collections::BTreeMap<Vec<u8>, Vec<u8>>> {
        {
            let write = self.write.lock();
            Self::ensure_open(&write)?;
        }

        let mut result: std::collections::BTreeMap<Vec<u8>, Vec<u8>> =
            self.storage.get_range(start, end)?.into_iter().collect();

        for (key, entry) in self.memtable.iter() {
            if key.as_slice() < start || key.as_slice() >= end {
                continue;
            }
            match entry {
                MemTableEntry::Value(value) => {
                    result.insert(key, value);
                }
                MemTableEntry::Tombstone => {
                    result.remove(&key);
                }
            }
        }

        Ok(result)
    }

    /// Flush the memtable, then delegate to the manager's compaction,
    /// all under the engine's exclusive write lock so neither can race
    /// a concurrent write. The flush matters: compaction only merges
    /// SSTables already on disk, so without it a full memtable's worth
    /// of writes would never be compacted.
    pub fn compact(&self) -> Result<()> {
        let mut write = self.write.lock();
        Self::ensure_open(&write)?;
        self.flush_locked(&mut write)?;
        self.storage.compact()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let write = self.write.lock();
        Self::ensure_open(&write)?;

        let storage_stats: StorageStats = self.storage.stats();
        let deleted_count = self
            .memtable
            .iter()
            .filter(|(_, entry)| matches!(entry, MemTableEntry::Tombstone))
            .count();

        Ok(StoreStats {
            memtable_size: self.memtable.size(),
            deleted_count,
            sstable_count: storage_stats.sstable_count,
            total_entries: storage_stats.total_entries,
            total_bytes: storage_stats.total_data_bytes,
            wal_bytes: write.wal.size(),
        })
    }

    /// Flush any pending data, close the WAL, then close the storage
    /// manager. Idempotent: calling this more than once, or on an
    /// already-closed engine, is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut write = self.write.lock();
        if write.state != EngineState::Open {
            return Ok(());
        }
        write.state = EngineState::Closing;

        if !self.memtable.is_empty() {
            self.flush_locked(&mut write)?;
        }
        write.wal.close()?;
        self.storage.close()?;
        write.state = EngineState::Closed;
        Ok(())
    }

    fn maybe_flush_and_checkpoint(&self, write: &mut WriteState) -> Result<()> {
        let past_threshold = write.writes_since_flush >= self.config.memtable_flush_threshold as u64;
        let past_checkpoint =
            write.last_checkpoint.elapsed() >= Duration::from_millis(self.config.checkpoint_interval_ms);

        if past_checkpoint {
            self.checkpoint_locked(write)?;
        } else if past_threshold {
            self.flush_locked(write)?;
        }

        if self.storage.sstable_count() >= self.config.max_sstables_before_compact {
            self.storage.compact()?;
        }

        Ok(())
    }

    /// Snapshot the memtable and write it as a new SSTable. Tombstones
    /// are carried into the new table rather than dropped, so a delete
    /// whose value still lives in an older table keeps shadowing it
    /// after the flush.
    fn flush_locked(&self, write: &mut WriteState) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        let entries: Vec<(Vec<u8>, SSTableValue)> = self
            .memtable
            .iter()
            .map(|(key, entry)| {
                let value = match entry {
                    MemTableEntry::Value(v) => SSTableValue::Value(v),
                    MemTableEntry::Tombstone => SSTableValue::Tombstone,
                };
                (key, value)
            })
            .collect();

        self.storage.create_sstable(entries)?;
        self.memtable.clear();
        write.writes_since_flush = 0;
        Ok(())
    }

    /// Flush, then truncate the WAL. The WAL may only be truncated after
    /// the flushed SSTable and updated manifest are durable, which
    /// `flush_locked` guarantees by returning only once
    /// `create_sstable` has persisted the manifest.
    fn checkpoint_locked(&self, write: &mut WriteState) -> Result<()> {
        self.flush_locked(write)?;
        write.wal.truncate()?;
        write.last_checkpoint = Instant::now();
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
