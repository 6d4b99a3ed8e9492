//! SSTable Reader
//!
//! Opens an SSTable's `.idx` file, loads the entire index into memory, and
//! serves point/range reads against the `.dat` file by seeking to the
//! recorded offsets. Grounded in the teacher's `SSTableReader` (in-memory
//! `BTreeMap` index, seek-based point lookup).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};

use super::iterator::SSTableIterator;
use super::{data_path, index_path, SSTableValue, TOMBSTONE_MARKER};

/// A loaded SSTable, ready to serve point and range reads.
pub struct SSTableReader {
    pub(crate) file_id: u64,
    pub(crate) creation_time: i64,
    dat_path: PathBuf,
    entry_count: u32,
    data_size: u64,
    /// key -> offset in the data file
    index: BTreeMap<Vec<u8>, u64>,
}

impl SSTableReader {
    /// Open an SSTable for reading, loading its index fully into memory.
    pub fn open(dir: &Path, file_id: u64) -> Result<Self> {
        let idx_path = index_path(dir, file_id);
        let dat_path = data_path(dir, file_id);

        let mut idx_file = File::open(&idx_path)?;
        let mut header = [0u8; 8 + 8 + 4 + 8];
        idx_file.read_exact(&mut header)?;

        let stored_file_id = i64::from_be_bytes(header[0..8].try_into().unwrap()) as u64;
        if stored_file_id != file_id {
            return Err(AtlasError::Corrupt(format!(
                "SSTable index file-id mismatch: filename says {file_id}, header says {stored_file_id}"
            )));
        }
        let creation_time = i64::from_be_bytes(header[8..16].try_into().unwrap());
        let entry_count = i32::from_be_bytes(header[16..20].try_into().unwrap());
        if entry_count < 0 {
            return Err(AtlasError::Corrupt("negative entry count in SSTable index".into()));
        }
        let data_size = i64::from_be_bytes(header[20..28].try_into().unwrap());
        if data_size < 0 {
            return Err(AtlasError::Corrupt("negative data size in SSTable index".into()));
        }

        let mut index = BTreeMap::new();
        for _ in 0..entry_count {
            let mut key_len_buf = [0u8; 4];
            idx_file.read_exact(&mut key_len_buf)?;
            let key_len = i32::from_be_bytes(key_len_buf);
            if key_len < 0 {
                return Err(AtlasError::Corrupt("negative key length in SSTable index".into()));
            }
            let mut key = vec![0u8; key_len as usize];
            idx_file.read_exact(&mut key)?;

            let mut offset_buf = [0u8; 8];
            idx_file.read_exact(&mut offset_buf)?;
            let offset = i64::from_be_bytes(offset_buf) as u64;

            index.insert(key, offset);
        }

        Ok(Self {
            file_id,
            creation_time,
            dat_path,
            entry_count: entry_count as u32,
            data_size: data_size as u64,
            index,
        })
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// O(1) index probe — no I/O.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a key. Returns `None` if the key is absent from this table
    /// (the caller should keep searching older tables); returns
    /// `Some(SSTableValue::Tombstone)` if this table's most recent entry
    /// for the key is a delete.
    pub fn get(&self, key: &[u8]) -> Result<Option<SSTableValue>> {
        let Some(&offset) = self.index.get(key) else {
            return Ok(None);
        };
        self.read_value_at(offset, key.len()).map(Some)
    }

    fn read_value_at(&self, offset: u64, key_len: usize) -> Result<SSTableValue> {
        let mut file = File::open(&self.dat_path)?;
        file.seek(SeekFrom::Start(offset))?;

        // skip [key_len: i32][key]
        file.seek(SeekFrom::Current(4 + key_len as i64))?;

        let mut val_len_buf = [0u8; 4];
        file.read_exact(&mut val_len_buf)?;
        let val_len = i32::from_be_bytes(val_len_buf);

        if val_len == TOMBSTONE_MARKER {
            return Ok(SSTableValue::Tombstone);
        }
        if val_len < 0 {
            return Err(AtlasError::Corrupt("negative value length in SSTable data file".into()));
        }

        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;
        Ok(SSTableValue::Value(value))
    }

    /// Entries with `start <= key < end`, ordered by key ascending.
    pub fn get_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, SSTableValue)>> {
        let mut out = Vec::new();
        for (key, &offset) in self.index.range(start.to_vec()..end.to_vec()) {
            let value = self.read_value_at(offset, key.len())?;
            out.push((key.clone(), value));
        }
        Ok(out)
    }

    /// All entries, ordered by key ascending.
    pub fn get_all(&self) -> Result<Vec<(Vec<u8>, SSTableValue)>> {
        let mut out = Vec::with_capacity(self.index.len());
        for (key, &offset) in self.index.iter() {
            let value = self.read_value_at(offset, key.len())?;
            out.push((key.clone(), value));
        }
        Ok(out)
    }

    /// Sequential iterator over all entries in sorted key order, reading
    /// the data file once rather than one seek per entry.
    pub fn iter(&self) -> Result<SSTableIterator> {
        SSTableIterator::new(&self.dat_path, self.index.len())
    }
}
