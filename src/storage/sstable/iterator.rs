//! SSTable Iterator
//!
//! Sequential, single-pass iteration over an SSTable's data file in sorted
//! key order. The data file is already sorted by construction, so this
//! just walks it front to back rather than seeking per entry like
//! `SSTableReader::get` does.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{AtlasError, Result};

use super::{SSTableValue, TOMBSTONE_MARKER};

pub struct SSTableIterator {
    reader: BufReader<File>,
    remaining: usize,
}

impl SSTableIterator {
    pub(crate) fn new(dat_path: &Path, entry_count: usize) -> Result<Self> {
        let file = File::open(dat_path)?;
        Ok(Self { reader: BufReader::new(file), remaining: entry_count })
    }

    fn read_entry(&mut self) -> Result<(Vec<u8>, SSTableValue)> {
        let mut key_len_buf = [0u8; 4];
        self.reader.read_exact(&mut key_len_buf)?;
        let key_len = i32::from_be_bytes(key_len_buf);
        if key_len < 0 {
            return Err(AtlasError::Corrupt("negative key length in SSTable data file".into()));
        }
        let mut key = vec![0u8; key_len as usize];
        self.reader.read_exact(&mut key)?;

        let mut val_len_buf = [0u8; 4];
        self.reader.read_exact(&mut val_len_buf)?;
        let val_len = i32::from_be_bytes(val_len_buf);

        let value = if val_len == TOMBSTONE_MARKER {
            SSTableValue::Tombstone
        } else if val_len < 0 {
            return Err(AtlasError::Corrupt("negative value length in SSTable data file".into()));
        } else {
            let mut value = vec![0u8; val_len as usize];
            self.reader.read_exact(&mut value)?;
            SSTableValue::Value(value)
        };

        Ok((key, value))
    }
}

impl Iterator for SSTableIterator {
    type Item = Result<(Vec<u8>, SSTableValue)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.read_entry())
    }
}
