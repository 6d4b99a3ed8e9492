//! SSTable Manager
//!
//! Owns the set of on-disk SSTables, keeps the manifest in sync with what
//! is actually on disk, and answers reads by scanning tables newest to
//! oldest so a later write always shadows an earlier one. Grounded in the
//! teacher's `StorageManager` shape (`open`/`get`/`flush`/`compact`
//! surface), rebuilt on top of the two-file SSTable format and manifest
//! persistence this crate actually uses.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::error::{AtlasError, Result};

use super::manifest::Manifest;
use super::sstable::{data_path, index_path, SSTableReader, SSTableValue, SSTableWriter};

/// Aggregate statistics about the storage layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStats {
    pub sstable_count: usize,
    pub total_entries: u64,
    pub total_data_bytes: u64,
}

/// Owns the live SSTable set for one data directory.
pub struct SSTableManager {
    dir: PathBuf,
    /// Oldest table first, mirroring the manifest's order; the newest
    /// table is the last entry.
    tables: RwLock<Vec<SSTableReader>>,
    manifest: RwLock<Manifest>,
    next_id_tiebreaker: AtomicU64,
}

impl SSTableManager {
    /// Open the storage layer rooted at `dir`. Loads the manifest, opens
    /// every table it lists, and reconciles against what is actually on
    /// disk: file pairs present on disk but absent from the manifest are
    /// removed (leftovers from a crash between writing a table and
    /// persisting the manifest); tables the manifest lists but whose
    /// files are missing are logged and skipped rather than failing
    /// startup outright.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let manifest = Manifest::load(dir)?;
        let mut tables = Vec::with_capacity(manifest.file_ids().len());
        let mut live_ids = Vec::with_capacity(manifest.file_ids().len());

        for &id in manifest.file_ids() {
            if !data_path(dir, id).exists() || !index_path(dir, id).exists() {
                tracing::warn!(file_id = id, "SSTable listed in manifest is missing from disk, skipping");
                continue;
            }
            match SSTableReader::open(dir, id) {
                Ok(reader) => {
                    tables.push(reader);
                    live_ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(file_id = id, error = %e, "failed to open SSTable listed in manifest, skipping");
                }
            }
        }

        let mut reconciled = Manifest::new();
        reconciled.set(live_ids);

        let manager = Self {
            dir: dir.to_path_buf(),
            tables: RwLock::new(tables),
            manifest: RwLock::new(reconciled),
            next_id_tiebreaker: AtomicU64::new(0),
        };

        manager.sweep_orphans()?;
        manager.manifest.read().persist(&manager.dir)?;

        Ok(manager)
    }

    /// Remove on-disk `.dat`/`.idx` pairs that exist but are not part of
    /// the live table set — the result of a crash between a table being
    /// written and the manifest being persisted to include it.
    fn sweep_orphans(&self) -> Result<()> {
        let live: std::collections::HashSet<u64> =
            self.manifest.read().file_ids().iter().copied().collect();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(id) = parse_sstable_id(&name) else { continue };
            if !live.contains(&id) {
                tracing::warn!(file_id = id, "removing orphaned SSTable file not listed in manifest");
                let _ = SSTableWriter::delete(&self.dir, id);
            }
        }
        Ok(())
    }

    /// Generate a new file id: wall-clock milliseconds with a per-process
    /// monotonic tiebreaker packed into the low bits, so ids created
    /// within the same millisecond still sort and compare distinctly.
    pub fn next_file_id(&self) -> u64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let tiebreaker = self.next_id_tiebreaker.fetch_add(1, Ordering::Relaxed) & 0xFFF;
        (millis << 12) | tiebreaker
    }

    /// Write `entries` as a new SSTable and register it as the newest
    /// live table. Persists the manifest before returning, so the new
    /// table is durably visible before the caller truncates its WAL.
    pub fn create_sstable(&self, entries: Vec<(Vec<u8>, SSTableValue)>) -> Result<u64> {
        let file_id = self.next_file_id();
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        SSTableWriter::create(&self.dir, file_id, creation_time, entries)?;
        let reader = SSTableReader::open(&self.dir, file_id)?;

        {
            let mut tables = self.tables.write();
            let mut manifest = self.manifest.write();
            tables.push(reader);
            manifest.push_back(file_id);
            manifest.persist(&self.dir)?;
        }

        Ok(file_id)
    }

    /// Look up a key across all live tables, newest first. Returns
    /// `Some(SSTableValue::Tombstone)` if the newest table holding any
    /// entry for this key recorded a delete.
    pub fn get(&self, key: &[u8]) -> Result<Option<SSTableValue>> {
        for table in self.tables.read().iter().rev() {
            if let Some(value) = table.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Merge `start <= key < end` across all tables, newest table's
    /// entry for a key winning over older tables' entries for the same
    /// key. Tombstones are filtered out of the result.
    pub fn get_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: std::collections::BTreeMap<Vec<u8>, SSTableValue> = std::collections::BTreeMap::new();

        // oldest to newest, so a later insert overwrites an earlier one
        for table in self.tables.read().iter() {
            for (key, value) in table.get_range(start, end)? {
                merged.insert(key, value);
            }
        }

        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| match v {
                SSTableValue::Value(v) => Some((k, v)),
                SSTableValue::Tombstone => None,
            })
            .collect())
    }

    /// Merge `start <= key < end` across every table, same as
    /// `get_range` but spanning the entire key space.
    pub fn get_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: std::collections::BTreeMap<Vec<u8>, SSTableValue> = std::collections::BTreeMap::new();

        for table in self.tables.read().iter() {
            for entry in table.get_all()? {
                merged.insert(entry.0, entry.1);
            }
        }

        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| match v {
                SSTableValue::Value(v) => Some((k, v)),
                SSTableValue::Tombstone => None,
            })
            .collect())
    }

    /// Merge every live table into a single new table. Tombstones are
    /// retained rather than purged — the minimal-correct behavior, kept
    /// so `compact()` stays idempotent on `stats().total_entries`.
    /// Deletes the replaced tables only after the manifest naming the
    /// merged table is durable.
    pub fn compact(&self) -> Result<Option<u64>> {
        let (old_ids, merged) = {
            let tables = self.tables.read();
            if tables.len() < 2 {
                return Ok(None);
            }

            let mut merged: std::collections::BTreeMap<Vec<u8>, SSTableValue> = std::collections::BTreeMap::new();
            for table in tables.iter() {
                for entry in table.get_all()? {
                    merged.insert(entry.0, entry.1);
                }
            }

            let old_ids: Vec<u64> = tables.iter().map(|t| t.file_id()).collect();
            (old_ids, merged)
        };

        let entries: Vec<(Vec<u8>, SSTableValue)> = merged.into_iter().collect();

        let file_id = self.next_file_id();
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        SSTableWriter::create(&self.dir, file_id, creation_time, entries)?;
        let reader = SSTableReader::open(&self.dir, file_id)?;

        {
            let mut tables = self.tables.write();
            let mut manifest = self.manifest.write();
            *tables = vec![reader];
            manifest.set(vec![file_id]);
            manifest.persist(&self.dir)?;
        }

        for id in old_ids {
            SSTableWriter::delete(&self.dir, id)?;
        }

        Ok(Some(file_id))
    }

    /// Bucketed merge: group the live tables into `target_count`
    /// consecutive runs (oldest-first order preserved) and merge each
    /// run into one new table, reducing the live set to at most
    /// `target_count` tables without collapsing everything into one the
    /// way `compact()` does. A no-op if already at or below
    /// `target_count`. Tombstones are retained in every merged run: a
    /// run's output table takes the position of the whole run in the
    /// ordered list, so a tombstone dropped here could let a value in an
    /// un-merged older table outside the run reappear.
    pub fn merge(&self, target_count: usize) -> Result<usize> {
        if target_count == 0 {
            return Err(AtlasError::InvalidArgument("merge target_count must be at least 1".into()));
        }

        let (old_ids, buckets) = {
            let tables = self.tables.read();
            if tables.len() <= target_count {
                return Ok(tables.len());
            }

            let total = tables.len();
            let base = total / target_count;
            let extra = total % target_count;

            let mut buckets = Vec::with_capacity(target_count);
            let mut start = 0;
            for b in 0..target_count {
                let size = base + if b < extra { 1 } else { 0 };
                let mut merged: std::collections::BTreeMap<Vec<u8>, SSTableValue> = std::collections::BTreeMap::new();
                for table in &tables[start..start + size] {
                    for entry in table.get_all()? {
                        merged.insert(entry.0, entry.1);
                    }
                }
                buckets.push(merged.into_iter().collect::<Vec<_>>());
                start += size;
            }

            let old_ids: Vec<u64> = tables.iter().map(|t| t.file_id()).collect();
            (old_ids, buckets)
        };

        let mut new_ids = Vec::with_capacity(buckets.len());
        for entries in buckets {
            let file_id = self.next_file_id();
            let creation_time = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            SSTableWriter::create(&self.dir, file_id, creation_time, entries)?;
            new_ids.push(file_id);
        }

        let mut readers = Vec::with_capacity(new_ids.len());
        for &id in &new_ids {
            readers.push(SSTableReader::open(&self.dir, id)?);
        }
        let count = readers.len();

        {
            let mut tables = self.tables.write();
            let mut manifest = self.manifest.write();
            *tables = readers;
            manifest.set(new_ids);
            manifest.persist(&self.dir)?;
        }

        for id in old_ids {
            SSTableWriter::delete(&self.dir, id)?;
        }

        Ok(count)
    }

    /// Release file handles held by the live tables. `SSTableReader`
    /// opens the data file fresh per read rather than holding it open,
    /// so there is nothing to free today; kept for parity with the rest
    /// of the crate's `close()` methods. Does not delete anything.
    pub fn close(&self) -> Result<()> {
        Ok(())
    }

    pub fn stats(&self) -> StorageStats {
        let tables = self.tables.read();
        StorageStats {
            sstable_count: tables.len(),
            total_entries: tables.iter().map(|t| t.entry_count() as u64).sum(),
            total_data_bytes: tables.iter().map(|t| t.data_size()).sum(),
        }
    }

    pub fn sstable_count(&self) -> usize {
        self.tables.read().len()
    }
}

fn parse_sstable_id(filename: &str) -> Option<u64> {
    let stem = filename.strip_prefix("sst_")?;
    let stem = stem.strip_suffix(".dat").or_else(|| stem.strip_suffix(".idx"))?;
    stem.parse().ok()
}
