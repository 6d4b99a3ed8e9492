//! SSTable Writer
//!
//! Writes a sorted, immutable snapshot of entries to a new `.dat`/`.idx`
//! file pair, grounded in the teacher's `SSTableBuilder` (buffered writer,
//! running offset tracked per entry for the index) but adapted to the
//! two-file layout and tombstone-marker convention this crate uses.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

use super::{data_path, index_path, SSTableValue, TOMBSTONE_MARKER};

/// Metadata about a freshly written SSTable.
#[derive(Debug, Clone, Copy)]
pub struct SSTableMeta {
    pub file_id: u64,
    pub creation_time: i64,
    pub entry_count: u32,
    pub data_size: u64,
}

/// Writes a new SSTable file pair from a set of entries.
pub struct SSTableWriter;

impl SSTableWriter {
    /// Sort `entries` by key ascending and write them as a new SSTable
    /// identified by `file_id` inside `dir`. Fsyncs both files before
    /// returning.
    pub fn create(
        dir: &Path,
        file_id: u64,
        creation_time: i64,
        mut entries: Vec<(Vec<u8>, SSTableValue)>,
    ) -> Result<SSTableMeta> {
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let dat_path = data_path(dir, file_id);
        let idx_path = index_path(dir, file_id);

        let dat_file = OpenOptions::new().create(true).write(true).truncate(true).open(&dat_path)?;
        let mut dat_writer = BufWriter::new(dat_file);

        let mut index = Vec::with_capacity(entries.len());
        let mut offset: u64 = 0;

        for (key, value) in &entries {
            index.push((key.clone(), offset));

            let key_len = key.len() as i32;
            dat_writer.write_all(&key_len.to_be_bytes())?;
            dat_writer.write_all(key)?;
            offset += 4 + key.len() as u64;

            match value {
                SSTableValue::Value(v) => {
                    let val_len = v.len() as i32;
                    dat_writer.write_all(&val_len.to_be_bytes())?;
                    dat_writer.write_all(v)?;
                    offset += 4 + v.len() as u64;
                }
                SSTableValue::Tombstone => {
                    dat_writer.write_all(&TOMBSTONE_MARKER.to_be_bytes())?;
                    offset += 4;
                }
            }
        }

        dat_writer.flush()?;
        dat_writer.get_ref().sync_all()?;
        let data_size = offset;

        let idx_file = OpenOptions::new().create(true).write(true).truncate(true).open(&idx_path)?;
        let mut idx_writer = BufWriter::new(idx_file);

        idx_writer.write_all(&(file_id as i64).to_be_bytes())?;
        idx_writer.write_all(&creation_time.to_be_bytes())?;
        idx_writer.write_all(&(entries.len() as i32).to_be_bytes())?;
        idx_writer.write_all(&(data_size as i64).to_be_bytes())?;

        for (key, entry_offset) in &index {
            idx_writer.write_all(&(key.len() as i32).to_be_bytes())?;
            idx_writer.write_all(key)?;
            idx_writer.write_all(&(*entry_offset as i64).to_be_bytes())?;
        }

        idx_writer.flush()?;
        idx_writer.get_ref().sync_all()?;

        Ok(SSTableMeta {
            file_id,
            creation_time,
            entry_count: entries.len() as u32,
            data_size,
        })
    }

    /// Remove both files for `file_id` from disk. Only the SSTable manager
    /// calls this, and only after the superseding manifest is durable.
    pub fn delete(dir: &Path, file_id: u64) -> Result<()> {
        let dat = data_path(dir, file_id);
        let idx = index_path(dir, file_id);
        if dat.exists() {
            std::fs::remove_file(&dat)?;
        }
        if idx.exists() {
            std::fs::remove_file(&idx)?;
        }
        Ok(())
    }
}
