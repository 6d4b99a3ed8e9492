//! WAL Recovery
//!
//! Replays a WAL file in order, invoking a handler for each well-formed
//! record, and reports what happened.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::entry::Operation;
use super::reader::WalReader;

/// Result of a recovery/replay pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryResult {
    /// Number of records successfully replayed.
    pub records_recovered: u64,

    /// Number of corrupted records skipped (not counting a truncated tail).
    pub records_corrupted: u64,

    /// Byte offset immediately after the last valid record.
    pub last_position: u64,

    /// Whether the on-disk file was truncated to drop a partial trailing
    /// record or trailing corruption.
    pub was_truncated: bool,
}

/// Drives a [`WalReader`] over a file, invoking `handler(operation,
/// timestamp)` for each well-formed record in file order.
///
/// A malformed trailing record (partial write after a crash) stops replay
/// without error; the file is truncated to drop it. Other decode errors
/// are logged and skipped byte-by-byte inside `WalReader` itself.
pub fn replay<F>(path: &Path, mut handler: F) -> Result<RecoveryResult>
where
    F: FnMut(Operation, u64),
{
    let mut reader = WalReader::open(path)?;
    let mut records_recovered = 0u64;

    loop {
        match reader.next_record()? {
            Some(record) => {
                handler(record.operation, record.timestamp);
                records_recovered += 1;
            }
            None => break,
        }
    }

    let last_position = reader.position();
    let records_corrupted = reader.corrupted_count();
    let file_len = std::fs::metadata(path)?.len();
    let was_truncated = last_position < file_len;

    if was_truncated {
        tracing::warn!(
            path = %path.display(),
            kept = last_position,
            dropped = file_len - last_position,
            "truncating WAL at last fully decoded record"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(last_position)?;
        file.sync_all()?;
    }

    Ok(RecoveryResult {
        records_recovered,
        records_corrupted,
        last_position,
        was_truncated,
    })
}

/// Verify the integrity of a WAL file without modifying it or invoking any
/// side effects (used by tooling/diagnostics, not the engine's own startup
/// path).
pub fn verify(path: &Path) -> Result<RecoveryResult> {
    let mut reader = WalReader::open(path)?;
    let mut records_recovered = 0u64;

    while reader.next_record()?.is_some() {
        records_recovered += 1;
    }

    let last_position = reader.position();
    let records_corrupted = reader.corrupted_count();
    let file_len = std::fs::metadata(path)?.len();

    Ok(RecoveryResult {
        records_recovered,
        records_corrupted,
        last_position,
        was_truncated: last_position < file_len,
    })
}
