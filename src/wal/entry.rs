//! WAL record definitions
//!
//! Defines the structure of individual WAL log records and their exact
//! on-disk byte layout (big-endian, no padding):
//!
//! ```text
//! timestamp : i64
//! op        : u16 length-prefixed UTF-8 string ("PUT" or "DELETE")
//! key_len   : i32, key bytes
//! val_len   : i32, value bytes (val_len = 0 for DELETE)
//! ```

use crate::error::{AtlasError, Result};

/// The operation a [`Record`] performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    fn tag(&self) -> &'static str {
        match self {
            Operation::Put { .. } => "PUT",
            Operation::Delete { .. } => "DELETE",
        }
    }

    fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } => key,
            Operation::Delete { key } => key,
        }
    }

    fn value(&self) -> &[u8] {
        match self {
            Operation::Put { value, .. } => value,
            Operation::Delete { .. } => &[],
        }
    }
}

/// A single WAL record: an operation plus the timestamp at which it was
/// acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub operation: Operation,
    /// Unix epoch milliseconds at the point of acknowledgment.
    pub timestamp: u64,
}

impl Record {
    pub fn new(operation: Operation, timestamp: u64) -> Self {
        Self { operation, timestamp }
    }

    /// Encode this record to its exact on-disk byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let tag = self.operation.tag();
        let key = self.operation.key();
        let value = self.operation.value();

        let mut buf = Vec::with_capacity(8 + 2 + tag.len() + 4 + key.len() + 4 + value.len());
        buf.extend_from_slice(&(self.timestamp as i64).to_be_bytes());
        buf.extend_from_slice(&(tag.len() as u16).to_be_bytes());
        buf.extend_from_slice(tag.as_bytes());
        buf.extend_from_slice(&(key.len() as i32).to_be_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(&(value.len() as i32).to_be_bytes());
        buf.extend_from_slice(value);
        buf
    }

    /// Decode a record from a buffer containing exactly one encoded record.
    /// Returns `CorruptError` (via `AtlasError::Corrupt`) on malformed input.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);

        let timestamp = cursor.read_i64()? as u64;

        let op_len = cursor.read_u16()? as usize;
        let op_bytes = cursor.read_bytes(op_len)?;
        let op_tag = std::str::from_utf8(op_bytes)
            .map_err(|e| AtlasError::Corrupt(format!("non-utf8 op tag: {e}")))?;

        let key_len = cursor.read_i32()?;
        if key_len < 0 {
            return Err(AtlasError::Corrupt("negative key length".into()));
        }
        let key = cursor.read_bytes(key_len as usize)?.to_vec();

        let val_len = cursor.read_i32()?;
        if val_len < 0 {
            return Err(AtlasError::Corrupt("negative value length".into()));
        }
        let value = cursor.read_bytes(val_len as usize)?.to_vec();

        let operation = match op_tag {
            "PUT" => Operation::Put { key, value },
            "DELETE" => Operation::Delete { key },
            other => {
                return Err(AtlasError::Corrupt(format!("unknown WAL op tag: {other}")));
            }
        };

        Ok(Record::new(operation, timestamp))
    }
}

/// Minimal byte cursor used by [`Record::decode`]; every read is bounds
/// checked and turns a short buffer into `AtlasError::Corrupt` rather than
/// panicking.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            return Err(AtlasError::Corrupt("unexpected end of record".into()));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }
}
