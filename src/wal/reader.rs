//! WAL Reader
//!
//! Sequentially scans a WAL file, decoding records for crash recovery.
//! A malformed trailing record (partial write after a crash) stops
//! iteration without error; other decode errors are logged and skipped
//! byte-by-byte in a best-effort attempt to resynchronize.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{AtlasError, Result};
use super::entry::Record;

/// Reads records from a WAL file sequentially.
pub struct WalReader {
    file: File,
    position: u64,
    file_size: u64,
    corrupted_count: u64,
}

impl WalReader {
    /// Open a WAL file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { file, position: 0, file_size, corrupted_count: 0 })
    }

    /// Byte offset immediately after the last successfully decoded record.
    /// Anything between this and the file's length is either a truncated
    /// trailing record or bytes skipped while resynchronizing after
    /// corruption.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of malformed-but-complete records skipped so far.
    pub fn corrupted_count(&self) -> u64 {
        self.corrupted_count
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at a clean end-of-file, or when the trailing
    /// bytes do not form a complete record (a crash mid-append). Other
    /// malformed records are logged and skipped one byte at a time.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if self.position >= self.file_size {
                return Ok(None);
            }

            match self.try_decode_at(self.position)? {
                DecodeOutcome::Truncated => return Ok(None),
                DecodeOutcome::Corrupt(msg) => {
                    tracing::warn!(
                        offset = self.position,
                        error = %msg,
                        "skipping corrupt WAL record"
                    );
                    self.corrupted_count += 1;
                    self.position += 1;
                }
                DecodeOutcome::Record(record, end) => {
                    self.position = end;
                    return Ok(Some(record));
                }
            }
        }
    }

    /// Consume this reader and return an iterator over all valid records.
    pub fn records(self) -> WalIterator {
        WalIterator { reader: self }
    }

    fn try_decode_at(&mut self, start: u64) -> Result<DecodeOutcome> {
        self.file.seek(SeekFrom::Start(start))?;

        let mut buf = Vec::new();

        let Some(ts_bytes) = self.read_checked(8)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        buf.extend_from_slice(&ts_bytes);

        let Some(op_len_bytes) = self.read_checked(2)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        let op_len = u16::from_be_bytes(op_len_bytes.as_slice().try_into().unwrap()) as usize;
        buf.extend_from_slice(&op_len_bytes);

        let Some(op_bytes) = self.read_checked(op_len)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        buf.extend_from_slice(&op_bytes);

        let Some(key_len_bytes) = self.read_checked(4)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        let key_len = i32::from_be_bytes(key_len_bytes.as_slice().try_into().unwrap());
        buf.extend_from_slice(&key_len_bytes);
        if key_len < 0 {
            return Ok(DecodeOutcome::Corrupt("negative key length".into()));
        }

        let Some(key_bytes) = self.read_checked(key_len as usize)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        buf.extend_from_slice(&key_bytes);

        let Some(val_len_bytes) = self.read_checked(4)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        let val_len = i32::from_be_bytes(val_len_bytes.as_slice().try_into().unwrap());
        buf.extend_from_slice(&val_len_bytes);
        if val_len < 0 {
            return Ok(DecodeOutcome::Corrupt("negative value length".into()));
        }

        let Some(val_bytes) = self.read_checked(val_len as usize)? else {
            return Ok(DecodeOutcome::Truncated);
        };
        buf.extend_from_slice(&val_bytes);

        let end = start + buf.len() as u64;

        match Record::decode(&buf) {
            Ok(record) => Ok(DecodeOutcome::Record(record, end)),
            Err(AtlasError::Corrupt(msg)) => Ok(DecodeOutcome::Corrupt(msg)),
            Err(e) => Err(e),
        }
    }

    /// Read exactly `len` bytes, returning `Ok(None)` if fewer than `len`
    /// bytes remain before EOF (a truncated trailing record) rather than
    /// propagating an error.
    fn read_checked(&mut self, len: usize) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; len];
        match self.file.read_exact(&mut buf) {
            Ok(()) => Ok(Some(buf)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(AtlasError::Io(e)),
        }
    }
}

enum DecodeOutcome {
    Record(Record, u64),
    Truncated,
    Corrupt(String),
}

/// Iterator over WAL records, terminating at the first truncated or
/// end-of-file position.
pub struct WalIterator {
    reader: WalReader,
}

impl Iterator for WalIterator {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
