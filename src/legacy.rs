//! Legacy Store
//!
//! A naive append-only key-value file, kept around to contrast with the
//! engine's durability/compaction model. No WAL, no compaction, no
//! tombstone carry-through — the last record for a key simply wins
//! because the index always points at the newest offset. Grounded in the
//! original single-file SSTable format this crate's `storage::sstable`
//! module was adapted away from; every record here carries a `crc32fast`
//! checksum the way that original footer did.
//!
//! ## Format (`kvstore.dat`)
//! ```text
//! [key_len: u32][val_len: u32][key][value][crc32: u32]
//! ```
//! All integers little-endian (this store predates the core's
//! big-endian convention and was never unified with it).
//!
//! `kvstore.idx` is not persisted; it is rebuilt by scanning the data
//! file once on open.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{AtlasError, Result};

const DATA_FILENAME: &str = "kvstore.dat";

struct Inner {
    file: File,
    /// key -> offset of that key's most recent record in the data file.
    index: BTreeMap<Vec<u8>, u64>,
}

/// A naive append-only store. Safe for concurrent use; writes are
/// serialized by an internal mutex, reads take a snapshot of the index
/// under that same mutex and then read the file independently.
pub struct LegacyStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl LegacyStore {
    /// Open (or create) the store rooted at `dir`, rebuilding the index
    /// by scanning the data file from the start.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATA_FILENAME);

        let file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        let index = Self::rebuild_index(&path)?;

        Ok(Self { path, inner: Mutex::new(Inner { file, index }) })
    }

    fn rebuild_index(path: &Path) -> Result<BTreeMap<Vec<u8>, u64>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut index = BTreeMap::new();
        let mut offset = 0u64;

        loop {
            let record_start = offset;
            let mut len_header = [0u8; 8];
            match reader.read_exact(&mut len_header) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(AtlasError::Io(e)),
            }

            let key_len = u32::from_le_bytes(len_header[0..4].try_into().unwrap()) as usize;
            let val_len = u32::from_le_bytes(len_header[4..8].try_into().unwrap()) as usize;

            let mut key = vec![0u8; key_len];
            let mut value = vec![0u8; val_len];
            let mut crc_buf = [0u8; 4];

            if reader.read_exact(&mut key).is_err()
                || reader.read_exact(&mut value).is_err()
                || reader.read_exact(&mut crc_buf).is_err()
            {
                tracing::warn!(offset = record_start, "legacy store data file ends with a partial record, stopping index rebuild");
                break;
            }

            let expected_crc = u32::from_le_bytes(crc_buf);
            let actual_crc = record_checksum(&key, &value);
            if actual_crc != expected_crc {
                tracing::warn!(offset = record_start, "legacy store record fails checksum, skipping");
                offset += (8 + key_len + val_len + 4) as u64;
                continue;
            }

            index.insert(key, record_start);
            offset += (8 + key_len + val_len + 4) as u64;
        }

        Ok(index)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();

        let offset = inner.file.seek(SeekFrom::End(0))?;
        let crc = record_checksum(key, value);

        let mut record = Vec::with_capacity(8 + key.len() + value.len() + 4);
        record.extend_from_slice(&(key.len() as u32).to_le_bytes());
        record.extend_from_slice(&(value.len() as u32).to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(value);
        record.extend_from_slice(&crc.to_le_bytes());

        inner.file.write_all(&record)?;
        inner.file.sync_all()?;
        inner.index.insert(key.to_vec(), offset);

        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = {
            let inner = self.inner.lock();
            match inner.index.get(key) {
                Some(&offset) => offset,
                None => return Ok(None),
            }
        };

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut len_header = [0u8; 8];
        file.read_exact(&mut len_header)?;
        let key_len = u32::from_le_bytes(len_header[0..4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(len_header[4..8].try_into().unwrap()) as usize;

        file.seek(SeekFrom::Current(key_len as i64))?;
        let mut value = vec![0u8; val_len];
        file.read_exact(&mut value)?;

        Ok(Some(value))
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().index.len()
    }
}

fn record_checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}
