//! WAL Writer
//!
//! Handles appending records to the WAL file. Every `append` is fsynced
//! before returning, so a write is durable before the engine acknowledges
//! it to the caller.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;
use super::entry::{Operation, Record};

/// Appends records to the WAL file, fsyncing each one before returning.
pub struct WalWriter {
    file: File,
    /// Current length of the file in bytes (next append's starting offset).
    length: u64,
}

impl WalWriter {
    /// Open or create a WAL file for writing, truncating any existing
    /// content. Use this for a fresh epoch (after a checkpoint or on first
    /// open with no prior WAL).
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file, length: 0 })
    }

    /// Open a WAL file in append mode, preserving its existing content.
    /// Used when recovery decided not to truncate (callers normally flush
    /// and truncate before continuing writes, but this constructor exists
    /// for callers that append without first truncating).
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let length = file.metadata()?.len();
        Ok(Self { file, length })
    }

    /// Append an operation to the WAL.
    ///
    /// Returns the byte offset at which the record begins. Fsyncs the
    /// written bytes and file metadata before returning; on any write or
    /// sync failure the caller must not apply the mutation elsewhere.
    pub fn append(&mut self, operation: Operation, timestamp: u64) -> Result<u64> {
        let position = self.length;
        let record = Record::new(operation, timestamp);
        let bytes = record.encode();

        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(&bytes)?;
        self.file.sync_all()?;

        self.length += bytes.len() as u64;
        Ok(position)
    }

    /// Current WAL length in bytes.
    pub fn size(&self) -> u64 {
        self.length
    }

    /// Atomically replace the log with an empty file. Callers must only
    /// call this after a successful flush whose effects are durable.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.length = 0;
        Ok(())
    }

    /// Flush and release. Idempotent — safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
